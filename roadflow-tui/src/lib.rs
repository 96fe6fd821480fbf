pub mod explorer;
pub mod map_view;

pub use explorer::{Explorer, GatewayMessage, Pane};
pub use map_view::MapProjection;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use roadflow_core::AppController;
use std::io;
use std::time::Duration;

/// Run the explorer until the user quits.
///
/// Blocks the calling thread. Gateway calls are spawned onto the current tokio
/// runtime, so call this from `spawn_blocking` or another thread that has a
/// runtime handle.
pub fn run(controller: AppController) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut explorer = Explorer::new(controller);
    explorer.load_authorities();

    let result = run_app(&mut terminal, &mut explorer);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    explorer: &mut Explorer,
) -> Result<()> {
    loop {
        explorer.process_messages();
        terminal.draw(|f| explorer.render(f))?;

        if explorer.should_quit() {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => explorer.handle_key(key),
                Event::Mouse(mouse) => explorer.handle_mouse(mouse),
                _ => {}
            }
        }
    }

    Ok(())
}
