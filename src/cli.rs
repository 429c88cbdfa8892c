//! Command-line surface.
//!
//! Commands are order-sensitive and run in sequence (a `--monitor` applies
//! to the probes after it), so argv is walked by hand into a structured
//! command list. All text parsing lives here; the probe engine only ever
//! sees parsed coordinates.

use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};

use crate::probe::Rect;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a click and await the damage response.
    Click { x: i16, y: i16 },
    /// Simulate a mouse drag and collect damage per step.
    Drag { points: Vec<(i16, i16)> },
    /// Watch a different area for damage from here on.
    Monitor(Rect),
    /// Change the damage collection timeout from here on.
    Wait(u64),
    /// Write a marker row to the log.
    Stamp(String),
    /// Just display damage events, no injection.
    Inspect,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    pub log_file: Option<PathBuf>,
    pub commands: Vec<Command>,
}

pub const USAGE: &str = "\
usage: xlatency [-o|--logfile <path>] [commands..]
Commands are any combination/order of:
-c|--click <XxY>                Send click and await damage response
-d|--drag <XxY,XxY,XxY,XxY..>   Simulate mouse drag and collect damage
-m|--monitor <WIDTHxHEIGHT+X+Y> Watch area for damage (default fullscreen)
-w|--wait <seconds>             Max time to wait for damage (default 5 secs, 0 waits forever)
-s|--stamp <string>             Write <string> to the log
-i|--inspect                    Just display damage events";

/// Walk argv (program name already stripped) into an ordered command list.
pub fn parse<I>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut invocation = Invocation::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--logfile" => {
                invocation.log_file = Some(PathBuf::from(value(&mut args, &arg)?));
            }
            "-c" | "--click" => {
                let (x, y) = parse_point(&value(&mut args, &arg)?)?;
                invocation.commands.push(Command::Click { x, y });
            }
            "-d" | "--drag" => {
                let raw = value(&mut args, &arg)?;
                let points = raw
                    .split(',')
                    .map(parse_point)
                    .collect::<Result<Vec<_>>>()?;
                invocation.commands.push(Command::Drag { points });
            }
            "-m" | "--monitor" => {
                let rect = parse_monitor(&value(&mut args, &arg)?)?;
                invocation.commands.push(Command::Monitor(rect));
            }
            "-w" | "--wait" => {
                let raw = value(&mut args, &arg)?;
                let secs = raw
                    .parse::<u64>()
                    .map_err(|_| anyhow!("failed to parse '{raw}' as a wait time"))?;
                invocation.commands.push(Command::Wait(secs));
            }
            "-s" | "--stamp" => {
                invocation.commands.push(Command::Stamp(value(&mut args, &arg)?));
            }
            "-i" | "--inspect" => invocation.commands.push(Command::Inspect),
            other => bail!("don't understand '{other}'"),
        }
    }

    Ok(invocation)
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next().ok_or_else(|| anyhow!("{flag} needs a value"))
}

/// "XxY" screen coordinates, non-negative.
fn parse_point(raw: &str) -> Result<(i16, i16)> {
    let (x, y) = raw
        .split_once('x')
        .ok_or_else(|| anyhow!("failed to parse '{raw}' as XxY"))?;
    Ok((parse_coord(x, raw)?, parse_coord(y, raw)?))
}

fn parse_coord(field: &str, raw: &str) -> Result<i16> {
    let coord: i16 = field
        .trim()
        .parse()
        .map_err(|_| anyhow!("failed to parse '{raw}' as XxY"))?;
    if coord < 0 {
        bail!("coordinates in '{raw}' must be non-negative");
    }
    Ok(coord)
}

/// "WIDTHxHEIGHT+X+Y" monitor geometry.
fn parse_monitor(raw: &str) -> Result<Rect> {
    let err = || anyhow!("failed to parse '{raw}' as WIDTHxHEIGHT+X+Y");

    let (size, rest) = raw.split_once('+').ok_or_else(err)?;
    let (x, y) = rest.split_once('+').ok_or_else(err)?;
    let (width, height) = size.split_once('x').ok_or_else(err)?;

    Ok(Rect::new(
        x.parse().map_err(|_| err())?,
        y.parse().map_err(|_| err())?,
        width.parse().map_err(|_| err())?,
        height.parse().map_err(|_| err())?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_click() {
        let invocation = parse(args(&["-c", "100x200"])).unwrap();
        assert_eq!(invocation.commands, vec![Command::Click { x: 100, y: 200 }]);
    }

    #[test]
    fn test_parse_drag_points_in_order() {
        let invocation = parse(args(&["--drag", "0x0,10x20,30x40"])).unwrap();
        assert_eq!(
            invocation.commands,
            vec![Command::Drag {
                points: vec![(0, 0), (10, 20), (30, 40)]
            }]
        );
    }

    #[test]
    fn test_parse_monitor_geometry() {
        let invocation = parse(args(&["-m", "600x400+10+20"])).unwrap();
        assert_eq!(
            invocation.commands,
            vec![Command::Monitor(Rect::new(10, 20, 600, 400))]
        );
    }

    #[test]
    fn test_commands_keep_argv_order() {
        let invocation = parse(args(&[
            "-o", "out.log", "-w", "2", "-c", "1x1", "-m", "10x10+0+0", "-c", "2x2", "-s", "done",
        ]))
        .unwrap();

        assert_eq!(invocation.log_file, Some(PathBuf::from("out.log")));
        assert_eq!(
            invocation.commands,
            vec![
                Command::Wait(2),
                Command::Click { x: 1, y: 1 },
                Command::Monitor(Rect::new(0, 0, 10, 10)),
                Command::Click { x: 2, y: 2 },
                Command::Stamp("done".into()),
            ]
        );
    }

    #[test]
    fn test_rejects_malformed_point() {
        assert!(parse(args(&["-c", "100"])).is_err());
        assert!(parse(args(&["-c", "ax20"])).is_err());
        assert!(parse(args(&["-c", "-5x20"])).is_err());
    }

    #[test]
    fn test_rejects_malformed_monitor() {
        assert!(parse(args(&["-m", "600x400"])).is_err());
        assert!(parse(args(&["-m", "600+10+20"])).is_err());
    }

    #[test]
    fn test_rejects_missing_value_and_unknown_flag() {
        assert!(parse(args(&["-c"])).is_err());
        assert!(parse(args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn test_negative_wait_rejected() {
        assert!(parse(args(&["-w", "-3"])).is_err());
    }
}
