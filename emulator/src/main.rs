mod plant;
mod session;

use std::env;
use std::io::{self, Write};
use std::process;

use session::{Profile, Session};

fn main() -> io::Result<()> {
    let profile = parse_profile().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!(
            "Usage: glow-emulator [--profile <cold|hot|overcurrent|open-circuit>] | glow-emulator <profile>"
        );
        process::exit(2);
    });

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(profile).map_err(|err| io::Error::other(err.to_string()))?;

    writeln!(
        writer,
        "Glow Plug Controller Emulator: {} profile, {} ms ticks",
        session.profile(),
        session::TICK_MS
    )?;

    let summary = session.run(&mut writer)?;
    writeln!(writer, "{summary}")?;
    writer.flush()
}

fn parse_profile() -> Result<Profile, String> {
    let mut args = env::args().skip(1);
    if let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--profile=") {
            Profile::from_tag(value)
        } else if arg == "--profile" {
            if let Some(value) = args.next() {
                Profile::from_tag(&value)
            } else {
                Err("Expected value after --profile".to_string())
            }
        } else {
            Profile::from_tag(&arg)
        }
    } else {
        Ok(Profile::Cold)
    }
}
