pub mod browser;
pub mod diagnostics;
pub mod error;
pub mod expect;
pub mod flow;
pub mod locator;
pub mod resolver;
pub mod session;
pub mod surface;

//  Re-export commonly used items
pub use browser::{ChromeDialog, ChromeDriver, ChromePage, ConnectionMode};
pub use diagnostics::DomDiagnostics;
pub use error::BrowserError;
pub use expect::{expect_text, expect_title, expect_url, expect_visible, UrlMatcher, UrlPattern};
pub use flow::{
    Flow, FlowReport, FlowRunner, FlowSettings, FlowStep, MenuItem, StepResult, StepStatus,
};
pub use locator::{Locator, Selector};
pub use resolver::{ElementFinder, MenuOpened, MenuOpener, MenuOptions, OpenedBy, Strategy};
pub use session::{Session, TeardownStack};
pub use surface::{probe, DialogWatch, Surface};
