pub mod finder;
pub mod menu;

pub use finder::{ElementFinder, Strategy};
pub use menu::{MenuOpened, MenuOpener, MenuOptions, OpenedBy};
