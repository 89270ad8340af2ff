use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::config::MIN_LADDER_CELLS;
use crate::scrape::tables::{cell_text, extract_tables, Table};
use crate::types::LadderRecord;

static SELECT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("select").unwrap());
static OPTION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("option").unwrap());
static SELECTED_OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option[selected]").unwrap());

/// Any of these in the header row marks a ladder table.
const LADDER_HEADER_KEYWORDS: &[&str] = &["team", "win", "loss", "draw", "%"];

/// A `<select>` whose id or name contains one of these holds the division picker.
const DIVISION_SELECT_KEYWORDS: &[&str] = &["grade", "division", "section", "comp"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LadderPage {
    pub division: Option<String>,
    /// Teams in table order; position = index + 1.
    pub rows: Vec<LadderRecord>,
}

/// Parse a fetched ladder page. A page with no ladder table gives an empty
/// `rows`; that is "no data", not an error.
pub fn parse_ladder_page(html: &str) -> LadderPage {
    let doc = Html::parse_document(html);
    let division = extract_division(&doc);
    let tables = extract_tables(&doc);

    let Some(table) = find_ladder_table(&tables) else {
        warn!(tables = tables.len(), "No ladder table among {} tables", tables.len());
        return LadderPage { division, rows: Vec::new() };
    };

    let mut rows = parse_ladder_table(table);
    if let Some(ref d) = division {
        for r in &mut rows {
            r.division = Some(d.clone());
        }
    }

    info!(
        teams = rows.len(),
        division = division.as_deref().unwrap_or("-"),
        "Parsed {} ladder rows",
        rows.len(),
    );
    LadderPage { division, rows }
}

pub fn is_ladder_header(header: &[String]) -> bool {
    let joined = header.join(" ");
    LADDER_HEADER_KEYWORDS.iter().any(|k| joined.contains(k))
}

/// First table whose header looks like a ladder. Later candidates are ignored.
pub fn find_ladder_table(tables: &[Table]) -> Option<&Table> {
    tables.iter().find(|t| is_ladder_header(&t.header()))
}

pub fn parse_ladder_table(table: &Table) -> Vec<LadderRecord> {
    let header = table.header();
    debug!(?header, "Ladder table header");

    table
        .data_rows()
        .iter()
        .filter(|cells| cells.len() >= MIN_LADDER_CELLS)
        .filter_map(|cells| map_ladder_row(&header, cells))
        .collect()
}

// ---------------------------------------------------------------------------
// Column heuristics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderField {
    Team,
    Wins,
    Draws,
    Losses,
    WinPercentage,
    PointsFor,
    PointsAgainst,
    GamesPlayed,
}

/// Map one normalized header cell to the field it holds. Order matters:
/// "team"/"club" wins over everything, exact tokens are tried before substrings.
pub fn classify_header(h: &str) -> Option<LadderField> {
    if h.contains("team") || h.contains("club") {
        return Some(LadderField::Team);
    }
    match h {
        "w" | "win" | "wins" => return Some(LadderField::Wins),
        "d" | "draw" | "draws" | "tie" | "ties" => return Some(LadderField::Draws),
        "l" | "loss" | "losses" | "lose" => return Some(LadderField::Losses),
        "%" | "win%" | "win %" | "percentage" | "pct" => return Some(LadderField::WinPercentage),
        _ => {}
    }
    if h.contains("for") || h.contains("pf") {
        Some(LadderField::PointsFor)
    } else if h.contains("against") || h.contains("pa") {
        Some(LadderField::PointsAgainst)
    } else if h.contains("played") || h.contains("gp") || h.contains("games") {
        Some(LadderField::GamesPlayed)
    } else {
        None
    }
}

/// Build a record from one data row. `None` when the row has no team name.
/// Malformed numbers read as 0; they never reject the row.
pub fn map_ladder_row(header: &[String], values: &[String]) -> Option<LadderRecord> {
    let mut rec = LadderRecord::empty();

    for (h, raw) in header.iter().zip(values) {
        let value = raw.trim();
        match classify_header(h) {
            Some(LadderField::Team) => rec.team_name = value.to_string(),
            Some(LadderField::Wins) => rec.wins = safe_int(value).max(0),
            Some(LadderField::Draws) => rec.draws = safe_int(value).max(0),
            Some(LadderField::Losses) => rec.losses = safe_int(value).max(0),
            Some(LadderField::WinPercentage) => rec.win_percentage = percentage(value),
            Some(LadderField::PointsFor) => rec.points_for = safe_int(value),
            Some(LadderField::PointsAgainst) => rec.points_against = safe_int(value),
            Some(LadderField::GamesPlayed) => rec.games_played = safe_int(value).max(0),
            None => {}
        }
    }

    if rec.team_name.is_empty() {
        return None;
    }

    if rec.games_played == 0 {
        rec.games_played = rec.wins + rec.draws + rec.losses;
    }
    if rec.win_percentage == 0.0 && rec.games_played > 0 {
        rec.win_percentage = (rec.wins as f64 + 0.5 * rec.draws as f64) / rec.games_played as f64;
    }
    rec.win_percentage = rec.win_percentage.clamp(0.0, 1.0);

    Some(rec)
}

/// `"66.7%"` → 0.667, `"1%"` → 0.01, `"0.667"` → 0.667.
/// A `%` sign or a value above 1 marks a whole percentage.
fn percentage(s: &str) -> f64 {
    let v = safe_float(s);
    if s.contains('%') || v > 1.0 {
        v / 100.0
    } else {
        v
    }
}

/// Digits and minus sign only; anything unparsable is 0.
pub fn safe_int(s: &str) -> i64 {
    let clean: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '-').collect();
    clean.parse().unwrap_or(0)
}

/// Digits, minus sign and decimal point only; anything unparsable is 0.0.
pub fn safe_float(s: &str) -> f64 {
    let clean: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();
    clean.parse().unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Division
// ---------------------------------------------------------------------------

/// The label of the division picker's current choice, if the page has one.
pub fn extract_division(doc: &Html) -> Option<String> {
    for select in doc.select(&SELECT) {
        let attr = |name: &str| select.value().attr(name).unwrap_or("").to_lowercase();
        let (id, name) = (attr("id"), attr("name"));
        if !DIVISION_SELECT_KEYWORDS
            .iter()
            .any(|k| id.contains(k) || name.contains(k))
        {
            continue;
        }

        if let Some(selected) = select.select(&SELECTED_OPTION).next() {
            let text = cell_text(selected);
            if !text.is_empty() {
                debug!(division = %text, "Selected division option");
                return Some(text);
            }
        }

        let fallback = select
            .select(&OPTION)
            .map(cell_text)
            .find(|t| !t.is_empty() && !is_placeholder_option(t));
        if let Some(text) = fallback {
            debug!(division = %text, "No selected option; using first real option");
            return Some(text);
        }
    }

    warn!("Could not find grade/division picker");
    None
}

fn is_placeholder_option(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    t.starts_with("select") || t.starts_with("choose") || t.starts_with("--")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn maps_standard_ladder_row() {
        let header = strings(&["team", "w", "d", "l", "%", "pf", "pa"]);
        let row = strings(&["Eagles", "10", "2", "3", "66.7%", "450", "380"]);
        let rec = map_ladder_row(&header, &row).unwrap();

        assert_eq!(rec.team_name, "Eagles");
        assert_eq!((rec.wins, rec.draws, rec.losses), (10, 2, 3));
        assert!((rec.win_percentage - 0.667).abs() < 1e-9);
        assert_eq!((rec.points_for, rec.points_against), (450, 380));
        assert_eq!(rec.games_played, 15);
    }

    #[test]
    fn games_played_derived_when_column_missing() {
        let header = strings(&["team", "wins", "draws", "losses"]);
        let row = strings(&["Hawks", "4", "1", "5"]);
        let rec = map_ladder_row(&header, &row).unwrap();
        assert_eq!(rec.games_played, rec.wins + rec.draws + rec.losses);
        assert_eq!(rec.games_played, 10);
    }

    #[test]
    fn explicit_games_played_is_kept() {
        let header = strings(&["club", "gp", "w", "l"]);
        let row = strings(&["Hawks", "12", "6", "4"]);
        let rec = map_ladder_row(&header, &row).unwrap();
        assert_eq!(rec.games_played, 12);
    }

    #[test]
    fn win_percentage_derived_counting_draws_as_half() {
        let header = strings(&["team", "w", "d", "l"]);
        let row = strings(&["Hawks", "3", "2", "5"]);
        let rec = map_ladder_row(&header, &row).unwrap();
        assert!((rec.win_percentage - 0.4).abs() < 1e-9);
    }

    #[test]
    fn fractional_percentage_not_divided() {
        let header = strings(&["team", "pct", "w", "l"]);
        let row = strings(&["Hawks", "0.75", "3", "1"]);
        let rec = map_ladder_row(&header, &row).unwrap();
        assert!((rec.win_percentage - 0.75).abs() < 1e-9);
    }

    #[test]
    fn small_percent_sign_values_are_whole_percentages() {
        let header = strings(&["team", "w", "l", "%"]);
        let rec = map_ladder_row(&header, &strings(&["Owls", "0", "20", "1%"])).unwrap();
        assert!((rec.win_percentage - 0.01).abs() < 1e-9);

        let rec = map_ladder_row(&header, &strings(&["Owls", "0", "20", "0.5%"])).unwrap();
        assert!((rec.win_percentage - 0.005).abs() < 1e-9);

        let rec = map_ladder_row(&header, &strings(&["Eagles", "20", "0", "100%"])).unwrap();
        assert!((rec.win_percentage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn win_percentage_always_within_unit_range() {
        let header = strings(&["team", "%", "w", "l"]);
        for raw in ["250%", "-5", "abc", "100", "0"] {
            let row = strings(&["X", raw, "1", "1"]);
            let rec = map_ladder_row(&header, &row).unwrap();
            assert!(
                (0.0..=1.0).contains(&rec.win_percentage),
                "{raw} gave {}",
                rec.win_percentage
            );
        }
    }

    #[test]
    fn malformed_numbers_read_as_zero() {
        let header = strings(&["team", "w", "d", "l", "pf"]);
        let row = strings(&["Owls", "n/a", "", "-", "1,234"]);
        let rec = map_ladder_row(&header, &row).unwrap();
        assert_eq!((rec.wins, rec.draws, rec.losses), (0, 0, 0));
        assert_eq!(rec.points_for, 1234);
        assert_eq!(rec.games_played, 0);
        assert_eq!(rec.win_percentage, 0.0);
    }

    #[test]
    fn row_without_team_is_dropped() {
        let header = strings(&["team", "w", "d", "l"]);
        let row = strings(&["  ", "1", "2", "3"]);
        assert!(map_ladder_row(&header, &row).is_none());
    }

    #[test]
    fn classify_prefers_team_then_exact_tokens() {
        assert_eq!(classify_header("team name"), Some(LadderField::Team));
        assert_eq!(classify_header("w"), Some(LadderField::Wins));
        assert_eq!(classify_header("ties"), Some(LadderField::Draws));
        assert_eq!(classify_header("percentage"), Some(LadderField::WinPercentage));
        assert_eq!(classify_header("points for"), Some(LadderField::PointsFor));
        assert_eq!(classify_header("points against"), Some(LadderField::PointsAgainst));
        assert_eq!(classify_header("played"), Some(LadderField::GamesPlayed));
        assert_eq!(classify_header("pos"), None);
    }

    const LADDER_PAGE: &str = r#"
        <html><body>
          <select id="ctl00_gradeSelect">
            <option value="">Select grade</option>
            <option value="1">U16 Boys Div 1</option>
            <option value="2" selected="selected">U16 Boys Div 2</option>
          </select>
          <table><tr><td>Round</td><td>Date</td></tr><tr><td>1</td><td>x</td></tr></table>
          <table>
            <tr><th>Pos</th><th>Team</th><th>P</th><th>W</th><th>D</th><th>L</th><th>%</th></tr>
            <tr><td>1</td><td>Eagles</td><td>-</td><td>10</td><td>2</td><td>3</td><td>66.7%</td></tr>
            <tr><td>2</td><td>Hawks</td><td>-</td><td>8</td><td>0</td><td>7</td><td>53.3%</td></tr>
            <tr><td colspan="7">Byes: none</td></tr>
          </table>
          <table>
            <tr><th>Team</th><th>W</th><th>L</th><th>D</th></tr>
            <tr><td>Other</td><td>1</td><td>1</td><td>1</td></tr>
          </table>
        </body></html>"#;

    #[test]
    fn parses_first_ladder_table_with_division() {
        let page = parse_ladder_page(LADDER_PAGE);
        assert_eq!(page.division.as_deref(), Some("U16 Boys Div 2"));

        let names: Vec<_> = page.rows.iter().map(|r| r.team_name.as_str()).collect();
        assert_eq!(names, vec!["Eagles", "Hawks"]);
        assert!(page
            .rows
            .iter()
            .all(|r| r.division.as_deref() == Some("U16 Boys Div 2")));
        assert_eq!(page.rows[1].games_played, 15);
    }

    #[test]
    fn division_falls_back_to_first_real_option() {
        let doc = Html::parse_document(
            r#"<select name="competition">
                 <option>Choose...</option>
                 <option>Senior Men A</option>
               </select>"#,
        );
        assert_eq!(extract_division(&doc).as_deref(), Some("Senior Men A"));
    }

    #[test]
    fn unrelated_selects_are_ignored() {
        let doc = Html::parse_document(
            r#"<select id="season"><option selected>2025</option></select>"#,
        );
        assert_eq!(extract_division(&doc), None);
    }

    #[test]
    fn page_without_tables_is_empty() {
        let page = parse_ladder_page("<html><body><p>Ladder coming soon</p></body></html>");
        assert!(page.rows.is_empty());
        assert_eq!(page.division, None);
    }
}
