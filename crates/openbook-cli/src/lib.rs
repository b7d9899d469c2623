//! Shared plumbing for the import binaries.

use std::io::{BufRead, BufReader, Read};

use anyhow::Result;

/// Split a PGN stream into whole games.
///
/// A game is a tag section, a blank line, and movetext; the next tag
/// section after movetext starts a new game. The splitter is purely
/// line-based, the server does the real parsing.
pub fn split_games(input: impl Read) -> Result<Vec<String>> {
    let mut games = Vec::new();
    let mut current = String::new();
    let mut in_movetext = false;

    for line in BufReader::new(input).lines() {
        let line = line?;
        let trimmed = line.trim_end();
        if trimmed.starts_with('[') && in_movetext {
            flush(&mut games, &mut current);
            in_movetext = false;
        } else if !trimmed.is_empty() && !trimmed.starts_with('[') {
            in_movetext = true;
        }
        current.push_str(trimmed);
        current.push('\n');
    }
    flush(&mut games, &mut current);
    Ok(games)
}

fn flush(games: &mut Vec<String>, current: &mut String) {
    let game = std::mem::take(current);
    if !game.trim().is_empty() {
        games.push(game.trim_matches('\n').to_owned() + "\n");
    }
}
