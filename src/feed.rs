//! The RSS feed record in its two shapes.
//!
//! [`RssFeedModel`] is the external record: the JSON state the host stores,
//! with `id` as a string. [`PutioFeed`] is the wire record put.io sends back,
//! with a numeric `id`. Conversion only ever goes wire to external; the
//! other direction is the form body built by [`RssFeedModel::to_create_form`].

use serde::{Deserialize, Deserializer, Serialize};
use url::form_urlencoded;

/// The external record tracked in host state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RssFeedModel {
    /// Server-assigned id, as a decimal string. Unset until create.
    #[serde(default)]
    pub id: Option<String>,
    /// Feed title.
    pub title: String,
    /// URL of the RSS source.
    pub rss_source_url: String,
    /// Folder new downloads land in. `0` is the root folder.
    #[serde(default)]
    pub parent_dir_id: i64,
    /// Whether put.io removes old files when space runs out.
    #[serde(default)]
    pub delete_old_files: bool,
    /// Keywords an item must match.
    pub keyword: String,
    /// Keywords that exclude an item.
    #[serde(default)]
    pub unwanted_keywords: String,
    /// Whether the feed is paused.
    #[serde(default)]
    pub paused: bool,
}

impl RssFeedModel {
    /// Encode the fields put.io's create endpoint accepts.
    ///
    /// Booleans are rendered as `true`/`false` and integers in decimal.
    pub fn to_create_form(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("title", &self.title)
            .append_pair("rss_source_url", &self.rss_source_url)
            .append_pair("parent_dir_id", &self.parent_dir_id.to_string())
            .append_pair("delete_old_files", bool_str(self.delete_old_files))
            // TODO: expose dont_process_whole_feed as a resource attribute.
            .append_pair("dont_process_whole_feed", "false")
            .append_pair("keyword", &self.keyword)
            .append_pair("unwanted_keywords", &self.unwanted_keywords)
            .append_pair("paused", bool_str(self.paused))
            .finish()
    }
}

impl From<PutioFeed> for RssFeedModel {
    fn from(feed: PutioFeed) -> Self {
        Self {
            id: Some(feed.id.to_string()),
            title: feed.title,
            rss_source_url: feed.rss_source_url,
            parent_dir_id: feed.parent_dir_id,
            delete_old_files: feed.delete_old_files,
            keyword: feed.keyword,
            unwanted_keywords: feed.unwanted_keywords,
            paused: feed.paused,
        }
    }
}

/// A feed as put.io returns it.
///
/// Missing or `null` fields decode to their zero values. Fields put.io adds
/// beyond these are ignored.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PutioFeed {
    #[serde(deserialize_with = "zero_if_null")]
    pub id: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub title: String,
    #[serde(deserialize_with = "zero_if_null")]
    pub rss_source_url: String,
    #[serde(deserialize_with = "zero_if_null")]
    pub parent_dir_id: i64,
    #[serde(deserialize_with = "zero_if_null")]
    pub delete_old_files: bool,
    #[serde(deserialize_with = "zero_if_null")]
    pub keyword: String,
    #[serde(deserialize_with = "zero_if_null")]
    pub unwanted_keywords: String,
    #[serde(deserialize_with = "zero_if_null")]
    pub paused: bool,
}

/// Response envelope of the feed endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedEnvelope {
    /// The feed itself.
    pub feed: PutioFeed,
    /// put.io's status string, `"OK"` on success.
    #[serde(deserialize_with = "zero_if_null")]
    pub status: String,
}

fn zero_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> RssFeedModel {
        RssFeedModel {
            id: None,
            title: "one".to_string(),
            rss_source_url: "https://google.fr".to_string(),
            parent_dir_id: 0,
            delete_old_files: false,
            keyword: "foo".to_string(),
            unwanted_keywords: String::new(),
            paused: false,
        }
    }

    #[test]
    fn test_create_form_order_and_encoding() {
        let form = sample().to_create_form();
        assert_eq!(
            form,
            "title=one&rss_source_url=https%3A%2F%2Fgoogle.fr&parent_dir_id=0\
             &delete_old_files=false&dont_process_whole_feed=false&keyword=foo\
             &unwanted_keywords=&paused=false"
        );
    }

    #[test]
    fn test_create_form_escapes_values() {
        let mut model = sample();
        model.title = "My shows & more".to_string();
        model.unwanted_keywords = "cam,ts".to_string();
        model.parent_dir_id = -1;
        model.paused = true;

        let form = model.to_create_form();
        assert!(form.starts_with("title=My+shows+%26+more&"));
        assert!(form.contains("&parent_dir_id=-1&"));
        assert!(form.contains("&unwanted_keywords=cam%2Cts&"));
        assert!(form.ends_with("&paused=true"));
    }

    #[test]
    fn test_wire_to_external() {
        let envelope: FeedEnvelope = serde_json::from_value(json!({
            "feed": {
                "id": 1234,
                "title": "one",
                "rss_source_url": "https://google.fr",
                "parent_dir_id": 99,
                "delete_old_files": true,
                "keyword": "foo",
                "unwanted_keywords": "bar",
                "paused": true,
                "last_fetch": "2024-01-01T00:00:00"
            },
            "status": "OK"
        }))
        .unwrap();

        let model = RssFeedModel::from(envelope.feed);
        assert_eq!(model.id.as_deref(), Some("1234"));
        assert_eq!(model.parent_dir_id, 99);
        assert!(model.delete_old_files);
        assert_eq!(model.unwanted_keywords, "bar");
        assert!(model.paused);
    }

    #[test]
    fn test_wire_missing_and_null_fields_are_zero() {
        let envelope: FeedEnvelope = serde_json::from_value(json!({
            "feed": {"id": 7, "title": "one", "unwanted_keywords": null, "parent_dir_id": null}
        }))
        .unwrap();

        assert_eq!(envelope.status, "");
        let model = RssFeedModel::from(envelope.feed);
        assert_eq!(model.id.as_deref(), Some("7"));
        assert_eq!(model.parent_dir_id, 0);
        assert_eq!(model.unwanted_keywords, "");
        assert_eq!(model.keyword, "");
        assert!(!model.paused);
    }

    #[test]
    fn test_external_decode_requires_title() {
        let err = serde_json::from_value::<RssFeedModel>(json!({
            "rss_source_url": "https://google.fr",
            "keyword": "foo"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_external_round_trips_through_state() {
        let mut model = sample();
        model.id = Some("5".to_string());
        let state = serde_json::to_value(&model).unwrap();

        assert_eq!(state["id"], "5");
        assert_eq!(state["parent_dir_id"], 0);
        assert_eq!(serde_json::from_value::<RssFeedModel>(state).unwrap(), model);
    }
}
