pub mod config;
pub mod controller;
pub mod logging;
pub mod report;
pub mod state;

pub use config::Config;
pub use controller::{AppController, RefreshOutcome};
pub use state::{AppState, DetailOverlay, SelectionState, ViewportState};

pub fn print_banner() {
    println!(
        r#"
  ┏━┓┏━┓┏━┓╺┳┓┏━╸╻  ┏━┓╻ ╻
  ┣┳┛┃ ┃┣━┫ ┃┃┣╸ ┃  ┃ ┃┃╻┃
  ╹┗╸┗━┛╹ ╹╺┻┛╹  ┗━╸┗━┛┗┻┛  v{}
  annual average daily flow explorer
"#,
        env!("CARGO_PKG_VERSION")
    );
}
