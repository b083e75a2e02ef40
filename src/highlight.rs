//! Syntax-highlighted HTML rendering of snippets.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::html::{IncludeBackground, styled_line_to_highlighted_html};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use thiserror::Error;

use crate::models::Snippet;

pub const DEFAULT_LANGUAGE: &str = "python";
pub const DEFAULT_STYLE: &str = "InspiredGitHub";

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("no highlight theme named {0:?}")]
    UnknownStyle(String),

    #[error(transparent)]
    Syntect(#[from] syntect::Error),

    #[error(transparent)]
    Format(#[from] std::fmt::Error),
}

/// Languages are matched by file extension or case-insensitive name ("python", "rs").
pub fn is_known_language(token: &str) -> bool {
    SYNTAX_SET.find_syntax_by_token(token).is_some()
}

pub fn is_known_style(name: &str) -> bool {
    THEME_SET.themes.contains_key(name)
}

/// Names of every available style, sorted.
pub fn styles() -> Vec<&'static str> {
    THEME_SET.themes.keys().map(String::as_str).collect()
}

/// render
///
/// Produces a standalone HTML document: the title as heading, then the code
/// highlighted with the snippet's language and style. Line numbers are
/// prefixed when `linenos` is set. Unknown languages fall back to plain text.
pub fn render(snippet: &Snippet) -> Result<String, HighlightError> {
    let syntax = SYNTAX_SET
        .find_syntax_by_token(&snippet.language)
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let theme = theme(&snippet.style)?;

    let mut highlighter = HighlightLines::new(syntax, theme);
    let lines: Vec<&str> = LinesWithEndings::from(&snippet.code).collect();
    let width = lines.len().to_string().len();

    let mut body = String::new();
    for (index, line) in lines.iter().enumerate() {
        let ranges: Vec<(Style, &str)> = highlighter.highlight_line(line, &SYNTAX_SET)?;
        if snippet.linenos {
            write!(body, "<span class=\"lineno\">{:>width$} </span>", index + 1)?;
        }
        body.push_str(&styled_line_to_highlighted_html(&ranges[..], IncludeBackground::No)?);
    }

    let background = theme
        .settings
        .background
        .map(|c| format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b))
        .unwrap_or_else(|| "#ffffff".to_string());
    let title = html_escape::encode_text(&snippet.title);

    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html>")?;
    writeln!(html, "<head>")?;
    writeln!(html, "  <title>{title}</title>")?;
    writeln!(html, "  <meta http-equiv=\"content-type\" content=\"text/html; charset=utf-8\">")?;
    writeln!(
        html,
        "  <style>body {{ background: {background}; }} .lineno {{ color: #999999; user-select: none; }}</style>"
    )?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(html, "<h2>{title}</h2>")?;
    writeln!(html, "<pre style=\"background-color:{background};\">{body}</pre>")?;
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}

fn theme(name: &str) -> Result<&'static Theme, HighlightError> {
    THEME_SET
        .themes
        .get(name)
        .or_else(|| THEME_SET.themes.get(DEFAULT_STYLE))
        .ok_or_else(|| HighlightError::UnknownStyle(name.to_string()))
}
