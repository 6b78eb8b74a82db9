use crate::flags::FlagRecord;

/// Fixed header row of the published summary table.
pub const TABLE_HEADER: &str = "| *name* | *key* | *description* |";

/// Renders flags as a wiki markup table, one row per flag in input order.
/// Cell text is substituted verbatim; a delimiter character inside a field
/// is not escaped. An empty list yields the header line only.
pub fn render_table(flags: &[FlagRecord]) -> String {
    let rows = flags
        .iter()
        .map(|flag| format!("| {} | {} | {} |", flag.name, flag.key, flag.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{TABLE_HEADER}\n{rows}")
}

#[cfg(test)]
mod tests {
    use super::{TABLE_HEADER, render_table};
    use crate::flags::FlagRecord;

    fn flag(name: &str, key: &str, description: &str) -> FlagRecord {
        FlagRecord {
            name: name.to_string(),
            key: key.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn empty_list_renders_header_only() {
        assert_eq!(render_table(&[]), "| *name* | *key* | *description* |\n");
    }

    #[test]
    fn single_flag_renders_header_and_one_row() {
        let flags = vec![flag("dark-mode", "dm", "toggle dark UI")];
        assert_eq!(
            render_table(&flags),
            "| *name* | *key* | *description* |\n| dark-mode | dm | toggle dark UI |"
        );
    }

    #[test]
    fn rows_keep_input_order() {
        let flags = vec![
            flag("beta-banner", "bb", "show the beta banner"),
            flag("audit-log", "al", "record admin actions"),
        ];
        let expected = format!(
            "{TABLE_HEADER}\n| beta-banner | bb | show the beta banner |\n| audit-log | al | record admin actions |"
        );
        assert_eq!(render_table(&flags), expected);
    }

    #[test]
    fn identical_input_renders_identical_output() {
        let flags = vec![flag("dark-mode", "dm", "toggle dark UI")];
        assert_eq!(render_table(&flags), render_table(&flags));
    }

    #[test]
    fn cell_text_is_not_escaped() {
        let flags = vec![flag("pipe", "p1", "contains | a delimiter")];
        assert_eq!(
            render_table(&flags),
            "| *name* | *key* | *description* |\n| pipe | p1 | contains | a delimiter |"
        );
    }
}
