//! Conversion between live call values and their storable, tagged form.
//!
//! The conversion policy is a fixed three-way branch: a value either carries
//! the structured-dump capability, or it is already plain data, or it is
//! stored as its string form. Nothing is ever silently dropped.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cassette::format::{SerializedArgs, SerializedResponse};

/// Tag marking a response stored without any registered shape.
pub const RAW_TAG: &str = "raw";

/// Capability for values that can dump themselves to plain data and be
/// rebuilt from it on replay.
///
/// The serializer branches on this capability, never on type identity.
pub trait StructuredDump: fmt::Debug + Send + Sync {
    /// Stable tag identifying this value's concrete shape.
    fn type_tag(&self) -> &'static str;

    /// Plain-data form of this value.
    fn dump(&self) -> Value;

    /// Downcasting hook for callers that know the concrete shape.
    fn as_any(&self) -> &dyn Any;
}

/// A response crossing the interception seam.
#[derive(Debug)]
pub enum Response {
    /// A typed response carrying the structured-dump capability.
    Shaped(Box<dyn StructuredDump>),
    /// Plain data with no richer shape.
    Raw(Value),
}

impl Response {
    /// Wraps a value carrying the structured-dump capability.
    pub fn shaped<T: StructuredDump + 'static>(value: T) -> Self {
        Response::Shaped(Box::new(value))
    }

    /// Plain-data view of the response, whichever variant it is.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Response::Shaped(shape) => shape.dump(),
            Response::Raw(value) => value.clone(),
        }
    }
}

/// One positional or named argument, already classified by the conversion
/// policy.
#[derive(Debug)]
pub enum CallValue {
    /// Carries the structured-dump capability.
    Shaped(Box<dyn StructuredDump>),
    /// Already plain data.
    Plain(Value),
    /// No safe plain-data form; stored as its string form.
    Opaque(String),
}

impl CallValue {
    /// Wraps a value carrying the structured-dump capability.
    pub fn shaped<T: StructuredDump + 'static>(value: T) -> Self {
        CallValue::Shaped(Box::new(value))
    }

    /// Converts a serializable value to plain data, falling back to its
    /// debug string when it has no JSON form — stringified, never omitted.
    pub fn plain<T: Serialize + fmt::Debug>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(plain) => CallValue::Plain(plain),
            Err(_) => CallValue::Opaque(format!("{value:?}")),
        }
    }

    /// Stores a value as its string form.
    pub fn opaque(value: impl fmt::Display) -> Self {
        CallValue::Opaque(value.to_string())
    }

    fn to_value(&self) -> Value {
        match self {
            CallValue::Shaped(shape) => shape.dump(),
            CallValue::Plain(value) => value.clone(),
            CallValue::Opaque(text) => Value::String(text.clone()),
        }
    }
}

/// Positional and named arguments of one intercepted call.
#[derive(Debug, Default)]
pub struct CallArgs {
    /// Positional arguments, in call order.
    pub args: Vec<CallValue>,
    /// Named arguments, in insertion order.
    pub kwargs: Vec<(String, CallValue)>,
}

impl CallArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: CallValue) -> Self {
        self.args.push(value);
        self
    }

    /// Appends a named argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: CallValue) -> Self {
        self.kwargs.push((name.into(), value));
        self
    }
}

/// Converts call arguments to their storable form.
///
/// The output feeds the scrubber before persistence.
#[must_use]
pub fn serialize_args(call: &CallArgs) -> SerializedArgs {
    SerializedArgs {
        args: call.args.iter().map(CallValue::to_value).collect(),
        kwargs: call
            .kwargs
            .iter()
            .map(|(name, value)| (name.clone(), value.to_value()))
            .collect::<Map<String, Value>>(),
    }
}

/// Converts a response to its storable, tagged form.
#[must_use]
pub fn serialize_response(response: &Response) -> SerializedResponse {
    match response {
        Response::Shaped(shape) => SerializedResponse {
            type_tag: shape.type_tag().to_string(),
            data: shape.dump(),
        },
        Response::Raw(value) => {
            SerializedResponse { type_tag: RAW_TAG.to_string(), data: value.clone() }
        }
    }
}

type RebuildFn = fn(Value) -> Result<Box<dyn StructuredDump>, serde_json::Error>;

/// Closed, explicit registry of response shapes that can be rebuilt on
/// replay.
///
/// Tags absent from the registry are not an error; they fall back to raw
/// stored data in [`deserialize_response`].
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: HashMap<&'static str, RebuildFn>,
}

impl ShapeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reconstructible shape under its tag.
    ///
    /// The tag must match what values of `T` report from
    /// [`StructuredDump::type_tag`], or round-trips will miss the entry.
    pub fn register<T>(&mut self, tag: &'static str)
    where
        T: StructuredDump + DeserializeOwned + 'static,
    {
        fn rebuild<T>(data: Value) -> Result<Box<dyn StructuredDump>, serde_json::Error>
        where
            T: StructuredDump + DeserializeOwned + 'static,
        {
            Ok(Box::new(serde_json::from_value::<T>(data)?))
        }
        self.shapes.insert(tag, rebuild::<T>);
    }

    /// Tags this registry can rebuild.
    #[must_use]
    pub fn tags(&self) -> Vec<&'static str> {
        self.shapes.keys().copied().collect()
    }

    fn rebuild(
        &self,
        tag: &str,
        data: Value,
    ) -> Option<Result<Box<dyn StructuredDump>, serde_json::Error>> {
        self.shapes.get(tag).map(|rebuild| rebuild(data))
    }
}

/// Rebuilds a response from its stored form.
///
/// `"raw"` entries come back as stored. A known tag yields the reconstructed
/// shape; an unknown tag or a failed reconstruction degrades to the raw
/// stored data instead of failing the call, so replay keeps working across
/// response-shape drift.
#[must_use]
pub fn deserialize_response(shapes: &ShapeRegistry, entry: &SerializedResponse) -> Response {
    if entry.type_tag == RAW_TAG {
        return Response::Raw(entry.data.clone());
    }
    match shapes.rebuild(&entry.type_tag, entry.data.clone()) {
        Some(Ok(shape)) => Response::Shaped(shape),
        Some(Err(err)) => {
            tracing::warn!(tag = %entry.type_tag, %err, "response reconstruction failed; serving raw data");
            Response::Raw(entry.data.clone())
        }
        None => {
            tracing::debug!(tag = %entry.type_tag, "unknown response tag; serving raw data");
            Response::Raw(entry.data.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ChatReply {
        text: String,
        tokens: u32,
    }

    impl StructuredDump for ChatReply {
        fn type_tag(&self) -> &'static str {
            "chat.reply"
        }
        fn dump(&self) -> Value {
            serde_json::to_value(self).expect("plain-data struct")
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn registry() -> ShapeRegistry {
        let mut shapes = ShapeRegistry::new();
        shapes.register::<ChatReply>("chat.reply");
        shapes
    }

    #[test]
    fn registry_reports_registered_tags() {
        assert_eq!(registry().tags(), vec!["chat.reply"]);
        assert!(ShapeRegistry::new().tags().is_empty());
    }

    #[test]
    fn shaped_response_round_trips_through_registry() {
        let original = ChatReply { text: "HELLO_TEST_PASS".to_string(), tokens: 7 };
        let entry = serialize_response(&Response::shaped(original.clone()));
        assert_eq!(entry.type_tag, "chat.reply");

        let rebuilt = deserialize_response(&registry(), &entry);
        match rebuilt {
            Response::Shaped(shape) => {
                let reply = shape.as_any().downcast_ref::<ChatReply>().expect("same shape");
                assert_eq!(*reply, original);
            }
            Response::Raw(data) => panic!("expected shaped response, got raw {data}"),
        }
    }

    #[test]
    fn raw_response_passes_through_unchanged() {
        let entry = serialize_response(&Response::Raw(json!({"text": "plain"})));
        assert_eq!(entry.type_tag, RAW_TAG);

        let rebuilt = deserialize_response(&registry(), &entry);
        assert!(matches!(rebuilt, Response::Raw(ref data) if *data == json!({"text": "plain"})));
    }

    #[test]
    fn unknown_tag_falls_back_to_raw_data() {
        let entry = SerializedResponse {
            type_tag: "vendor.retired_shape".to_string(),
            data: json!({"text": "still served"}),
        };
        let rebuilt = deserialize_response(&registry(), &entry);
        assert!(
            matches!(rebuilt, Response::Raw(ref data) if *data == json!({"text": "still served"}))
        );
    }

    #[test]
    fn failed_reconstruction_falls_back_to_raw_data() {
        // Known tag, but the payload no longer fits the registered shape.
        let entry = SerializedResponse {
            type_tag: "chat.reply".to_string(),
            data: json!({"text": "drifted", "tokens": "not-a-number"}),
        };
        let rebuilt = deserialize_response(&registry(), &entry);
        assert!(matches!(rebuilt, Response::Raw(ref data) if data["text"] == json!("drifted")));
    }

    #[test]
    fn args_follow_the_three_way_policy() {
        let call = CallArgs::new()
            .arg(CallValue::shaped(ChatReply { text: "dumped".to_string(), tokens: 1 }))
            .arg(CallValue::plain(&json!({"plain": true})))
            .kwarg("model", CallValue::plain(&"claude-sonnet-4"))
            .kwarg("handle", CallValue::opaque("FileHandle(3)"));

        let serialized = serialize_args(&call);
        assert_eq!(serialized.args[0], json!({"text": "dumped", "tokens": 1}));
        assert_eq!(serialized.args[1], json!({"plain": true}));
        assert_eq!(serialized.kwargs["model"], json!("claude-sonnet-4"));
        assert_eq!(serialized.kwargs["handle"], json!("FileHandle(3)"));
    }

    #[test]
    fn response_to_value_matches_dump() {
        let reply = ChatReply { text: "x".to_string(), tokens: 2 };
        let shaped = Response::shaped(reply.clone());
        assert_eq!(shaped.to_value(), json!({"text": "x", "tokens": 2}));
        assert_eq!(Response::Raw(json!(null)).to_value(), json!(null));
    }
}
