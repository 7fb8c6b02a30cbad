use std::fs::File;
use std::path::Path;

use anyhow::Context;
use nws_crawler::replay::ResultSet;

/// Loads a captured result set, as JSON when the extension says so and as
/// YAML otherwise.
pub fn load_result_set(path: &Path) -> anyhow::Result<ResultSet> {
    let file = File::open(path).with_context(|| format!("Couldn't open fixture {path:?}"))?;
    let set: ResultSet = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_reader(file)?,
        _ => serde_yaml::from_reader(file)?,
    };
    if set.per_page == 0 {
        anyhow::bail!("Invalid fixture {path:?}, `perPage` must be positive");
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn yaml_fixture_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "perPage: 2\nsummaryDisplay: 총 3건\narticles:\n  - title: a\n    date: 2025/01/01\n  - title: b\n  - title: c\n"
        )
        .unwrap();

        let set = load_result_set(file.path()).unwrap();
        assert_eq!(set.per_page, 2);
        assert_eq!(set.block_size, 10);
        assert_eq!(set.articles.len(), 3);
        assert_eq!(set.page_count(), 2);
        assert_eq!(set.summary_display.as_deref(), Some("총 3건"));
    }

    #[test]
    fn json_fixture_needs_positive_page_size() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"perPage": 0, "articles": []}}"#).unwrap();
        assert!(load_result_set(file.path()).is_err());
    }
}
