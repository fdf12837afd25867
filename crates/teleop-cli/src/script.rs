//! Line-oriented pointer script read from stdin.
//!
//! Supported commands:
//!   down <mouse|ID> X Y   – press the mouse or touch `ID` at (X, Y)
//!   move <mouse|ID> X Y   – drag it
//!   up   <mouse|ID> [X Y] – release it
//!   status                – print the current link status
//!   help                  – show this list
//!   quit | exit           – stop the session

use teleop_controls::{PointerEvent, RawTouch};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pointer(PointerEvent),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pointer {
    Mouse,
    Touch(i64),
}

/// Parse one script line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let phase = match verb.to_ascii_lowercase().as_str() {
        "down" | "press" => Phase::Down,
        "move" | "drag" => Phase::Move,
        "up" | "release" => Phase::Up,
        "status" => return Ok(Some(Command::Status)),
        "help" | "?" => return Ok(Some(Command::Help)),
        "quit" | "exit" => return Ok(Some(Command::Quit)),
        other => return Err(format!("unknown command '{other}'")),
    };

    let pointer = match words.next() {
        Some(p) if p.eq_ignore_ascii_case("mouse") => Pointer::Mouse,
        Some(p) => Pointer::Touch(
            p.parse::<i64>()
                .map_err(|_| format!("expected 'mouse' or a touch id, got '{p}'"))?,
        ),
        None => return Err(format!("'{verb}' needs a pointer")),
    };

    let coords: Vec<&str> = words.collect();
    let (x, y) = match (phase, coords.as_slice()) {
        (Phase::Up, []) => (0.0, 0.0),
        (_, [x, y]) => (parse_coord(x)?, parse_coord(y)?),
        _ => return Err(format!("'{verb}' expects X and Y coordinates")),
    };

    Ok(Some(Command::Pointer(pointer_event(phase, pointer, x, y))))
}

fn parse_coord(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid coordinate '{raw}'"))
}

fn pointer_event(phase: Phase, pointer: Pointer, client_x: f64, client_y: f64) -> PointerEvent {
    match pointer {
        Pointer::Mouse => match phase {
            Phase::Down => PointerEvent::MouseDown { client_x, client_y },
            Phase::Move => PointerEvent::MouseMove { client_x, client_y },
            Phase::Up => PointerEvent::MouseUp { client_x, client_y },
        },
        Pointer::Touch(id) => {
            let touches = vec![RawTouch::new(id, client_x, client_y)];
            match phase {
                Phase::Down => PointerEvent::TouchStart(touches),
                Phase::Move => PointerEvent::TouchMove(touches),
                Phase::Up => PointerEvent::TouchEnd(touches),
            }
        }
    }
}
