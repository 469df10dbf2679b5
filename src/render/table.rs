//! Summary tables as aligned text, LaTeX or JSON.

use crate::Result;
use crate::model::summary::AggregateRow;

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableFormat {
    Text,
    Latex,
    Json,
}

pub fn render_table<R: AggregateRow>(rows: &[R], format: TableFormat) -> Result<String> {
    match format {
        TableFormat::Text => Ok(render_text(rows)),
        TableFormat::Latex => Ok(render_latex(rows)),
        TableFormat::Json => Ok(serde_json::to_string_pretty(rows)? + "\n"),
    }
}

fn render_text<R: AggregateRow>(rows: &[R]) -> String {
    let header: Vec<String> = R::header().iter().map(|h| h.to_string()).collect();
    let body: Vec<Vec<String>> = rows.iter().map(|r| r.cells()).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut out = line(&header);
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for cells in &body {
        out.push_str(&line(cells));
        out.push('\n');
    }
    out
}

fn latex_escape(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    for ch in cell.chars() {
        match ch {
            '\\' => out.push_str(r"\textbackslash{}"),
            '&' | '%' | '#' | '_' | '$' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            '±' => out.push_str(r"$\pm$"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_latex<R: AggregateRow>(rows: &[R]) -> String {
    let header = R::header();
    let mut out = format!("\\begin{{tabular}}{{{}}}\n\\hline\n", "l".repeat(header.len()));

    let escaped: Vec<String> = header.iter().map(|h| latex_escape(h)).collect();
    out.push_str(&escaped.join(" & "));
    out.push_str(" \\\\\n\\hline\n");

    for row in rows {
        let escaped: Vec<String> = row.cells().iter().map(|c| latex_escape(c)).collect();
        out.push_str(&escaped.join(" & "));
        out.push_str(" \\\\\n");
    }
    out.push_str("\\hline\n\\end{tabular}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        name: String,
        size: String,
    }

    impl AggregateRow for Row {
        fn header() -> Vec<&'static str> {
            vec!["#name", "size (Kb)"]
        }

        fn cells(&self) -> Vec<String> {
            vec![self.name.clone(), self.size.clone()]
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "wc_1".to_string(),
                size: "12 ± 3".to_string(),
            },
            Row {
                name: "pr".to_string(),
                size: "n/a".to_string(),
            },
        ]
    }

    #[test]
    fn text_columns_are_aligned() {
        let text = render_table(&rows(), TableFormat::Text).unwrap();
        assert_eq!(
            text,
            "#name  size (Kb)\n-----  ---------\nwc_1   12 ± 3\npr     n/a\n"
        );
    }

    #[test]
    fn latex_escapes_specials() {
        let latex = render_table(&rows(), TableFormat::Latex).unwrap();
        assert_eq!(
            latex,
            "\\begin{tabular}{ll}\n\\hline\n\\#name & size (Kb) \\\\\n\\hline\n\
             wc\\_1 & 12 $\\pm$ 3 \\\\\npr & n/a \\\\\n\\hline\n\\end{tabular}\n"
        );
    }

    #[test]
    fn json_is_an_array_of_rows() {
        let json = render_table(&rows(), TableFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "wc_1");
        assert_eq!(parsed.as_array().unwrap().len(), 2);
    }
}
