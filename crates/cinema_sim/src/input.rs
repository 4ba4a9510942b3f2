//! Text commands fed to the gallery: a tile id, `backdrop`, or `quit`.

use gallery_core::{HitTarget, TileId};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Tap(HitTarget),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("empty command")]
    Empty,
    #[error("unrecognized command `{0}` (expected a tile id, `tile <id>`, `backdrop` or `quit`)")]
    Unrecognized(String),
    #[error("`{0}` is not a tile id")]
    BadTileId(String),
}

fn tile_id(token: &str) -> Result<TileId, InputError> {
    token
        .parse::<TileId>()
        .map_err(|_| InputError::BadTileId(token.to_owned()))
}

/// Parses one stdin line.
pub fn parse_line(line: &str) -> Result<Command, InputError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(InputError::Empty);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => Command::Quit,
        "backdrop" | "b" => Command::Tap(HitTarget::Backdrop),
        "tile" | "t" => {
            let id = words.next().ok_or_else(|| InputError::BadTileId(String::new()))?;
            Command::Tap(HitTarget::Tile(tile_id(id)?))
        }
        _ if head.chars().all(|c| c.is_ascii_digit()) => Command::Tap(HitTarget::Tile(tile_id(head)?)),
        _ => return Err(InputError::Unrecognized(line.trim().to_owned())),
    };

    match words.next() {
        Some(_) => Err(InputError::Unrecognized(line.trim().to_owned())),
        None => Ok(command),
    }
}

/// Parses a comma-separated tap script such as `7,backdrop,3,9`.
pub fn parse_script(script: &str) -> Result<Vec<HitTarget>, InputError> {
    script
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match parse_line(entry)? {
            Command::Tap(target) => Ok(target),
            Command::Quit => Err(InputError::Unrecognized(entry.to_owned())),
        })
        .collect()
}
