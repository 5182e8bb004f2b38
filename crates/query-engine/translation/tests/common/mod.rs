use std::fs;
use std::path::PathBuf;

use query_engine_dsl::dsl;
use query_engine_translation::translation;

/// Translate the request of a golden test and render the plan.
pub async fn test_translation(
    testname: &str,
    kind: dsl::request::RequestKind,
) -> anyhow::Result<serde_json::Value> {
    let directory = goldenfiles().join(testname);

    let parsed_configuration = archive_query_configuration::parse_configuration(&directory).await?;
    let configuration = archive_query_configuration::make_runtime_configuration(parsed_configuration)?;

    let request: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(directory.join("request.json")).unwrap()).unwrap();
    let request = dsl::parse::request(kind, &request)?;

    let plan = translation::query::translate(&configuration, &request)?;
    Ok(plan.to_json())
}

fn goldenfiles() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("goldenfiles")
}
