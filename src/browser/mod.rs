pub mod chrome;
pub mod dialog;
pub mod page;

pub use chrome::{ChromeDriver, ConnectionMode};
pub use dialog::ChromeDialog;
pub use page::ChromePage;
