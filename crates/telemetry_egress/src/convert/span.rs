use super::ConversionContext;
use crate::encode::{
    duration_millis, encode_enum, encode_int, encode_span_id, encode_trace_id, encode_value,
    unix_millis,
};
use crate::model::{CapturedSpan, SpanKind};
use crate::wire::{SpanLog, SpanTag, WireSpan};
use std::collections::HashMap;

// Span tags
const SPAN_KIND_KEY: &str = "span.kind";
const ERROR_TAG_KEY: &str = "error";
const ERROR_CODE_TAG_KEY: &str = "error_code";

// Span log fields
const LOG_ERROR_MESSAGE_KEY: &str = "message";
const LOG_EVENT_KEY: &str = "event";
const ANNOTATION_MESSAGE_KEY: &str = "log_msg";
const MESSAGE_ID_KEY: &str = "MsgID";
const MESSAGE_TYPE_KEY: &str = "MsgType";
const MESSAGE_COMPRESSED_SIZE_KEY: &str = "MsgCompressedByteSize";
const MESSAGE_UNCOMPRESSED_SIZE_KEY: &str = "MsgUncompressedByteSize";

const SPAN_KIND_NAMES: [&str; 3] = ["unspecified", "server", "client"];

const MESSAGE_EVENT_NAMES: [&str; 3] = ["unspecified", "sent", "received"];

/// gRPC status code names, indexed by code.
const STATUS_CODE_NAMES: [&str; 17] = [
    "OK",
    "Cancelled",
    "Unknown",
    "InvalidArgument",
    "DeadlineExceeded",
    "NotFound",
    "AlreadyExists",
    "PermissionDenied",
    "ResourceExhausted",
    "FailedPrecondition",
    "Aborted",
    "OutOfRange",
    "Unimplemented",
    "Internal",
    "Unavailable",
    "DataLoss",
    "Unauthenticated",
];

/// Builds the wire form of a captured span.
pub fn convert_span(span: &CapturedSpan, ctx: &ConversionContext) -> WireSpan {
    WireSpan {
        name: span.name.clone(),
        start_millis: unix_millis(span.start_time),
        duration_millis: duration_millis(span.start_time, span.end_time),
        source: ctx.source.clone(),
        trace_id: encode_trace_id(&span.trace_id),
        span_id: encode_span_id(&span.span_id),
        parents: parent_ids(span),
        follows_from: Vec::new(),
        tags: span_tags(span, ctx),
        logs: span_logs(span),
    }
}

fn parent_ids(span: &CapturedSpan) -> Vec<String> {
    // root spans carry the zero id, which must not be sent as a parent
    if span.is_root() {
        Vec::new()
    } else {
        vec![encode_span_id(&span.parent_span_id)]
    }
}

fn span_tags(span: &CapturedSpan, ctx: &ConversionContext) -> Vec<SpanTag> {
    let mut tags = Vec::with_capacity(span.attributes.len() + ctx.app_tags.len() + 3);

    tags.extend(
        span.attributes
            .iter()
            .map(|(k, v)| SpanTag::new(k.as_str(), encode_value(v))),
    );
    tags.extend(
        ctx.app_tags
            .iter()
            .map(|(k, v)| SpanTag::new(k.as_str(), v.as_str())),
    );

    if span.kind != SpanKind::Unspecified {
        tags.push(SpanTag::new(
            SPAN_KIND_KEY,
            encode_enum(span.kind.index(), &SPAN_KIND_NAMES),
        ));
    }

    if !span.status.is_ok() {
        tags.push(SpanTag::new(ERROR_TAG_KEY, "true"));
        tags.push(SpanTag::new(
            ERROR_CODE_TAG_KEY,
            encode_enum(i64::from(span.status.code), &STATUS_CODE_NAMES),
        ));
    }

    tags
}

fn span_logs(span: &CapturedSpan) -> Vec<SpanLog> {
    let mut logs = Vec::with_capacity(1 + span.annotations.len() + span.message_events.len());

    if !span.status.is_ok() && !span.status.message.is_empty() {
        logs.push(SpanLog {
            timestamp_millis: unix_millis(span.end_time),
            fields: HashMap::from([
                (LOG_EVENT_KEY.to_string(), ERROR_TAG_KEY.to_string()),
                (LOG_ERROR_MESSAGE_KEY.to_string(), span.status.message.clone()),
            ]),
        });
    }

    for annotation in &span.annotations {
        let mut fields: HashMap<String, String> = annotation
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect();
        fields.insert(ANNOTATION_MESSAGE_KEY.to_string(), annotation.message.clone());
        logs.push(SpanLog {
            timestamp_millis: unix_millis(annotation.time),
            fields,
        });
    }

    for event in &span.message_events {
        logs.push(SpanLog {
            timestamp_millis: unix_millis(event.time),
            fields: HashMap::from([
                (MESSAGE_ID_KEY.to_string(), encode_int(event.message_id)),
                (
                    MESSAGE_TYPE_KEY.to_string(),
                    encode_enum(event.kind.index(), &MESSAGE_EVENT_NAMES).to_string(),
                ),
                (
                    MESSAGE_COMPRESSED_SIZE_KEY.to_string(),
                    encode_int(event.compressed_size),
                ),
                (
                    MESSAGE_UNCOMPRESSED_SIZE_KEY.to_string(),
                    encode_int(event.uncompressed_size),
                ),
            ]),
        });
    }

    logs
}
