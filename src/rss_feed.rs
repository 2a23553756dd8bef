//! The `putio_rss_feed` resource.
//!
//! Planning is local: schema validation, then the modifier chains that fill
//! in unset optional attributes. Create, read, and delete each make one call
//! to put.io. Update never reaches put.io; the planned values become the new
//! state as they are.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::ProviderError;
use crate::feed::RssFeedModel;
use crate::modifiers::{apply_plan_modifiers, PlanModifier};
use crate::provider::ProviderContext;
use crate::schema::{has_errors, Attribute, Diagnostic, Schema};
use crate::types::{diff_states, ImportedResource, PlanResult};
use crate::validation::validate;

/// Resource type name.
pub const RSS_FEED: &str = "putio_rss_feed";

/// Schema of `putio_rss_feed`.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Manage your rss feeds")
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("RSS feed id."),
        )
        .with_attribute(
            "title",
            Attribute::required_string()
                .with_description("Title of the RSS feed as will appear on the site."),
        )
        .with_attribute(
            "rss_source_url",
            Attribute::required_string().with_description("The URL of the RSS feed to be watched."),
        )
        .with_attribute(
            "parent_dir_id",
            Attribute::optional_computed_int64()
                .with_description("The file ID of the folder to place the RSS feed files in.")
                .with_plan_modifier(PlanModifier::UseStateForUnknown)
                .with_plan_modifier(PlanModifier::int64_default(0)),
        )
        .with_attribute(
            "delete_old_files",
            Attribute::optional_computed_bool()
                .with_description("Should old files in the folder be deleted when space is low.")
                .with_plan_modifier(PlanModifier::UseStateForUnknown)
                .with_plan_modifier(PlanModifier::bool_default(false)),
        )
        .with_attribute(
            "keyword",
            Attribute::required_string().with_description(
                "Only items with titles that contain any of these words will be transferred \
                 (comma-separated list of words).",
            ),
        )
        .with_attribute(
            "unwanted_keywords",
            Attribute::optional_computed_string()
                .with_description(
                    "No items with titles that contain any of these words will be transferred \
                     (comma-separated list of words).",
                )
                .with_plan_modifier(PlanModifier::string_default("")),
        )
        .with_attribute(
            "paused",
            Attribute::optional_computed_bool()
                .with_description("Should the RSS feed be created in the paused state.")
                .with_plan_modifier(PlanModifier::bool_default(false)),
        )
}

/// Compute the planned state of a feed.
///
/// A null `proposed_state` plans a destroy. Otherwise `config` (or the
/// proposed state, when the host sent no config) is validated, the prior
/// `id` is carried over, and unset optional attributes are filled in.
pub fn plan(
    prior_state: Option<&Value>,
    proposed_state: Value,
    config: &Value,
) -> Result<PlanResult, ProviderError> {
    let prior = prior_state.and_then(Value::as_object);

    if proposed_state.is_null() {
        let changes = prior
            .map(|prior| diff_states(Some(prior), &Map::new()))
            .unwrap_or_default();
        return Ok(PlanResult::with_changes(Value::Null, changes, false));
    }

    let schema = schema();
    let checked = if config.is_null() { &proposed_state } else { config };
    let diagnostics = validate(&schema, checked);
    if has_errors(&diagnostics) {
        return Err(validation_error(&diagnostics));
    }

    let mut planned = match proposed_state {
        Value::Object(map) => map,
        other => {
            return Err(ProviderError::Validation(format!(
                "planned state must be an object, got {}",
                other
            )))
        }
    };
    planned.retain(|name, _| schema.attribute(name).is_some());
    planned.insert(
        "id".to_string(),
        prior
            .and_then(|prior| prior.get("id"))
            .cloned()
            .unwrap_or(Value::Null),
    );

    let diagnostics = apply_plan_modifiers(&schema, prior, &mut planned);
    if has_errors(&diagnostics) {
        return Err(validation_error(&diagnostics));
    }

    let changes = diff_states(prior, &planned);
    Ok(PlanResult::with_changes(Value::Object(planned), changes, false))
}

/// Create the feed on put.io and return the state put.io reports.
pub async fn create(ctx: &ProviderContext, planned_state: Value) -> Result<Value, ProviderError> {
    let model: RssFeedModel = serde_json::from_value(planned_state)?;

    let created = ctx
        .client()
        .create_feed(model.to_create_form())
        .await
        .map_err(|e| ProviderError::client("Unable to create rss feed", e))?;
    debug!(id = created.feed.id, "created rss feed");

    Ok(serde_json::to_value(RssFeedModel::from(created.feed))?)
}

/// Refresh the whole record from put.io.
pub async fn read(ctx: &ProviderContext, current_state: &Value) -> Result<Value, ProviderError> {
    let id = feed_id(current_state)?;

    let fetched = ctx
        .client()
        .get_feed(id)
        .await
        .map_err(|e| ProviderError::client("Unable to read rss feed", e))?;
    debug!(id, "read rss feed");

    Ok(serde_json::to_value(RssFeedModel::from(fetched.feed))?)
}

/// Accept the planned values as the new state.
pub fn update(planned_state: Value) -> Result<Value, ProviderError> {
    let model: RssFeedModel = serde_json::from_value(planned_state)?;
    Ok(serde_json::to_value(model)?)
}

/// Delete the feed on put.io.
pub async fn delete(ctx: &ProviderContext, current_state: &Value) -> Result<(), ProviderError> {
    let id = feed_id(current_state)?;

    ctx.client()
        .delete_feed(id)
        .await
        .map_err(|e| ProviderError::client("Unable to delete rss feed", e))?;
    debug!(id, "deleted rss feed");
    Ok(())
}

/// Import an existing feed by id.
pub async fn import(ctx: &ProviderContext, id: &str) -> Result<ImportedResource, ProviderError> {
    let state = read(ctx, &json!({ "id": id })).await?;
    Ok(ImportedResource::new(RSS_FEED, state))
}

/// The numeric put.io id stored in a state's `id` attribute.
fn feed_id(state: &Value) -> Result<u64, ProviderError> {
    let id = state
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Validation("rss feed state has no id".to_string()))?;

    // Only plain digits, so the stored id reads back exactly as it was given.
    let invalid = || {
        ProviderError::Validation(format!("rss feed id must be a positive integer, got {:?}", id))
    };
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    id.parse().map_err(|_| invalid())
}

fn validation_error(diagnostics: &[Diagnostic]) -> ProviderError {
    let messages: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| match &d.detail {
            Some(detail) => format!("{}: {}", d.summary, detail),
            None => d.summary.clone(),
        })
        .collect();
    ProviderError::Validation(messages.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PutioClient;

    fn minimal_config() -> Value {
        json!({
            "title": "one",
            "rss_source_url": "https://google.fr",
            "keyword": "foo"
        })
    }

    #[test]
    fn test_plan_create_fills_defaults() {
        let config = minimal_config();
        let plan = plan(None, config.clone(), &config).unwrap();

        assert_eq!(
            plan.planned_state,
            json!({
                "id": null,
                "title": "one",
                "rss_source_url": "https://google.fr",
                "parent_dir_id": 0,
                "delete_old_files": false,
                "keyword": "foo",
                "unwanted_keywords": "",
                "paused": false
            })
        );
        assert!(!plan.requires_replace);
        // id is unknown until create
        assert!(plan.changes.iter().all(|c| c.path != "id"));
        assert_eq!(plan.changes.len(), 7);
    }

    #[test]
    fn test_plan_keeps_configured_values() {
        let config = json!({
            "title": "one",
            "rss_source_url": "https://google.fr",
            "keyword": "foo",
            "parent_dir_id": 42,
            "delete_old_files": true,
            "unwanted_keywords": "cam",
            "paused": true
        });
        let plan = plan(None, config.clone(), &config).unwrap();

        assert_eq!(plan.planned_state["parent_dir_id"], 42);
        assert_eq!(plan.planned_state["delete_old_files"], true);
        assert_eq!(plan.planned_state["unwanted_keywords"], "cam");
        assert_eq!(plan.planned_state["paused"], true);
    }

    #[test]
    fn test_plan_update_carries_id_and_prior_folder() {
        let prior = json!({
            "id": "17",
            "title": "one",
            "rss_source_url": "https://google.fr",
            "parent_dir_id": 99,
            "delete_old_files": true,
            "keyword": "foo",
            "unwanted_keywords": "",
            "paused": true
        });
        let config = json!({
            "title": "two",
            "rss_source_url": "https://google.fr",
            "keyword": "foo"
        });
        let plan = plan(Some(&prior), config.clone(), &config).unwrap();

        assert_eq!(plan.planned_state["id"], "17");
        assert_eq!(plan.planned_state["parent_dir_id"], 99);
        assert_eq!(plan.planned_state["delete_old_files"], true);
        // paused has no state carry-over, so it falls back to its default
        assert_eq!(plan.planned_state["paused"], false);

        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["paused", "title"]);
    }

    #[test]
    fn test_plan_without_changes() {
        let config = minimal_config();
        let first = plan(None, config.clone(), &config).unwrap();
        let mut state = first.planned_state;
        state["id"] = json!("5");

        let again = plan(Some(&state), config.clone(), &config).unwrap();
        assert!(again.changes.is_empty());
        assert_eq!(again.planned_state, state);
    }

    #[test]
    fn test_plan_destroy() {
        let prior = json!({"id": "5", "title": "one"});
        let plan = plan(Some(&prior), Value::Null, &Value::Null).unwrap();

        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changes.len(), 2);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_plan_rejects_missing_required() {
        let config = json!({"title": "one"});
        let err = plan(None, config.clone(), &config).unwrap_err();

        assert!(matches!(err, ProviderError::Validation(_)));
        let message = err.to_string();
        assert!(message.contains("rss_source_url"));
        assert!(message.contains("keyword"));
    }

    #[test]
    fn test_plan_rejects_wrong_type() {
        let mut config = minimal_config();
        config["parent_dir_id"] = json!("root");
        let err = plan(None, config.clone(), &config).unwrap_err();
        assert!(err.to_string().contains("parent_dir_id"));
    }

    #[test]
    fn test_plan_drops_unknown_attributes() {
        let mut config = minimal_config();
        config["dont_process_whole_feed"] = json!(true);
        let plan = plan(None, config.clone(), &config).unwrap();
        assert!(plan.planned_state.get("dont_process_whole_feed").is_none());
    }

    #[test]
    fn test_schema_defaults() {
        let schema = schema();
        let default_of = |name: &str| schema.attribute(name).and_then(|a| a.default.clone());

        assert_eq!(default_of("parent_dir_id"), Some(json!(0)));
        assert_eq!(default_of("delete_old_files"), Some(json!(false)));
        assert_eq!(default_of("unwanted_keywords"), Some(json!("")));
        assert_eq!(default_of("paused"), Some(json!(false)));
        assert_eq!(default_of("title"), None);
        assert!(schema.attribute("id").is_some_and(|a| a.flags.computed));
    }

    #[test]
    fn test_feed_id() {
        assert_eq!(feed_id(&json!({"id": "42"})).unwrap(), 42);
        assert!(feed_id(&json!({})).is_err());
        assert!(feed_id(&json!({"id": null})).is_err());
        assert!(feed_id(&json!({"id": "abc"})).is_err());
        assert!(feed_id(&json!({"id": "../1"})).is_err());
        assert!(feed_id(&json!({"id": "+5"})).is_err());
        assert!(feed_id(&json!({"id": " 5"})).is_err());
        assert!(feed_id(&json!({"id": ""})).is_err());
        assert!(feed_id(&json!({"id": "99999999999999999999999"})).is_err());
    }

    #[test]
    fn test_update_returns_planned_state() {
        let mut planned = plan(None, minimal_config(), &minimal_config())
            .unwrap()
            .planned_state;
        planned["id"] = json!("9");

        assert_eq!(update(planned.clone()).unwrap(), planned);
    }

    #[tokio::test]
    async fn test_create_rejects_undecodable_plan_before_calling_put_io() {
        // Nothing listens on this port; a request would fail with a client error.
        let client = PutioClient::new("token", "http://127.0.0.1:1").unwrap();
        let ctx = ProviderContext::new(client);

        let err = create(&ctx, json!({"title": "one"})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
    }
}
