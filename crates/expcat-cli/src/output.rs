use anyhow::Result;
use expcat_types::TimeCoverage;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Terminal styling, disabled when stdout is not a TTY or NO_COLOR is set.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn detect() -> Self {
        Self {
            enabled: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn heading(&self, text: &str) -> String {
        if self.enabled {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn name(&self, text: &str) -> String {
        if self.enabled {
            text.cyan().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn dim(&self, text: &str) -> String {
        if self.enabled {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn ok(&self, text: &str) -> String {
        if self.enabled {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn warn(&self, text: &str) -> String {
        if self.enabled {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn error(&self, text: &str) -> String {
        if self.enabled {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }
}

/// `start .. end`, or `-` for static data.
pub fn format_coverage(coverage: Option<&TimeCoverage>) -> String {
    match coverage {
        Some(c) => format!("{} .. {}", c.start, c.end),
        None => "-".to_string(),
    }
}

/// Left-aligned columns separated by two spaces. Width is measured before
/// styling, so callers pass raw text and a styler per column.
pub fn render_table(rows: &[Vec<String>], style: impl Fn(usize, &str) -> String) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|r| r.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    rows.iter()
        .map(|row| {
            let last = row.len().saturating_sub(1);
            let mut line = String::new();
            for (c, cell) in row.iter().enumerate() {
                line.push_str(&style(c, cell));
                if c < last {
                    let pad = widths[c] - cell.chars().count() + 2;
                    line.push_str(&" ".repeat(pad));
                }
            }
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expcat_types::CalendarDate;

    #[test]
    fn test_render_table_aligns_columns() {
        let rows = vec![
            vec!["temp".to_string(), "1 monthly".to_string(), "K".to_string()],
            vec!["area_t".to_string(), "static".to_string(), "m^2".to_string()],
        ];
        let lines = render_table(&rows, |_, cell| cell.to_string());
        assert_eq!(lines[0], "temp    1 monthly  K");
        assert_eq!(lines[1], "area_t  static     m^2");
    }

    #[test]
    fn test_render_table_styles_without_breaking_alignment() {
        let rows = vec![vec!["a".to_string(), "x".to_string()], vec!["bbb".to_string(), "y".to_string()]];
        let lines = render_table(&rows, |c, cell| if c == 0 { format!("<{}>", cell) } else { cell.to_string() });
        assert_eq!(lines[0], "<a>    x");
        assert_eq!(lines[1], "<bbb>  y");
    }

    #[test]
    fn test_format_coverage() {
        let coverage = TimeCoverage::new(CalendarDate::ymd(1900, 1, 16), CalendarDate::ymd(1900, 12, 16));
        assert_eq!(
            format_coverage(Some(&coverage)),
            "1900-01-16 00:00:00 .. 1900-12-16 00:00:00"
        );
        assert_eq!(format_coverage(None), "-");
        assert!(!Palette::plain().heading("x").contains('\u{1b}'));
    }
}
