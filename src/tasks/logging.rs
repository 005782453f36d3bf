/* ********************************************************************** **
**  This file is part of fdcheck.                                         **
**                                                                        **
**  fdcheck is free software: you can redistribute it and/or modify it    **
**  under the terms of the GNU General Public License as published by the **
**  Free Software Foundation, either version 3 of the License, or (at     **
**  your option) any later version.                                       **
**                                                                        **
**      http://www.gnu.org/licenses/                                      **
**                                                                        **
** Do note that, while the whole of fdcheck is licensed under the GPL,    **
** many parts of it are licensed under more permissive terms.             **
** ********************************************************************** */

use std::fmt;
use std::path::Path;
use std::sync::Once;
use std::time::Instant;

use log::{Level, LevelFilter};

use crate::Result;

fn dispatch() -> fern::Dispatch {
    let start = Instant::now();
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let t = start.elapsed();
            out.finish(format_args!("[{:>4}.{:03}s][{}][{}] {}",
                t.as_secs(),
                t.subsec_millis(),
                record.target(),
                ColorizedLevel(record.level()),
                message))
        })
        .level(LevelFilter::Debug)
        .level_for("fdcheck_tasks", LevelFilter::Trace)
        .level_for("fdcheck_numerical", LevelFilter::Debug)
        .level_for("fdcheck_structure", LevelFilter::Debug)
}

/// Log to stdout, and also to a file if one is given.
///
/// Fails if a logger is already installed.
pub fn setup_global_logger(path: Option<&Path>) -> Result<()> {
    let mut fern = dispatch().chain(std::io::stdout());
    if let Some(path) = path {
        fern = fern.chain(fern::log_file(path)?);
    }
    fern.apply()?;
    Ok(())
}

/// Install a logger whose output is captured by the test harness.
///
/// Safe to call from every test; only the first call does anything.
pub fn init_test_logger() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let fern = dispatch().chain(fern::Output::call(|record| println!("{}", record.args())));
        // a logger may already have been installed by other means
        let _ = fern.apply();
    });
}

#[derive(Debug, Copy, Clone)]
pub struct ColorizedLevel(pub Level);
impl fmt::Display for ColorizedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self.0 {
            Level::Error => ansi_term::Colour::Red.bold(),
            Level::Warn  => ansi_term::Colour::Red.normal(),
            Level::Info  => ansi_term::Colour::Cyan.bold(),
            Level::Debug => ansi_term::Colour::Yellow.dimmed(),
            Level::Trace => ansi_term::Colour::Cyan.normal(),
        };
        write!(f, "{}", style.paint(self.0.to_string()))
    }
}
