use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print left-aligned columns separated by two spaces. The last column is not
/// padded, so long selectors and error messages do not leave trailing blanks.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let widths: Vec<usize> = (0..headers.len())
        .map(|i| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(String::len)
                .chain(std::iter::once(headers[i].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: Vec<&str>| {
        let last = cells.len().saturating_sub(1);
        let line: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match widths.get(i) {
                Some(&w) if i < last => format!("{cell:w$}"),
                _ => cell.to_string(),
            })
            .collect();
        println!("{}", line.join("  "));
    };

    render(headers.to_vec());
    let separator: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    render(separator.iter().map(String::as_str).collect());
    for row in &rows {
        render(row.iter().map(String::as_str).collect());
    }
}
