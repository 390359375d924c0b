use std::time::{Duration, SystemTime, UNIX_EPOCH};

use aws_lambda_events::event::s3::S3Event;
use aws_sdk_rekognition::config::retry::RetryConfig;
use aws_sdk_rekognition::config::Builder as RekognitionConfigBuilder;
use aws_sdk_rekognition::error::DisplayErrorContext;
use aws_sdk_rekognition::types::{Face, Image, S3Object};
use aws_sdk_rekognition::Client as RekognitionClient;
use lambda_runtime::{tracing, Context, Error, LambdaEvent};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::HandlerError;
use crate::object_key;

/// An image reference whose key is still URL-encoded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InputEvent {
    pub s3_bucket: String,
    pub s3_key: String,
}

/// Payloads the function accepts: a direct invocation or an S3 notification.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Trigger {
    Direct(InputEvent),
    S3Notification(S3Event),
}

impl Trigger {
    pub(crate) fn into_input(self) -> Result<InputEvent, HandlerError> {
        let event = match self {
            Trigger::Direct(input) => return Ok(input),
            Trigger::S3Notification(event) => event,
        };
        if event.records.len() > 1 {
            tracing::warn!(
                ignored = event.records.len() - 1,
                "Only the first S3 record is indexed"
            );
        }
        let record = event.records.into_iter().next().ok_or(HandlerError::EmptyEvent)?;
        match (record.s3.bucket.name, record.s3.object.key) {
            (Some(s3_bucket), Some(s3_key)) => Ok(InputEvent { s3_bucket, s3_key }),
            _ => Err(HandlerError::EmptyEvent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BoundingBox {
    pub height: f64,
    pub left: f64,
    pub top: f64,
    pub width: f64,
}

/// The first face Rekognition indexed from the image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct OutputFace {
    pub bounding_box: BoundingBox,
    pub confidence: f64,
    pub face_id: String,
    pub image_id: String,
}

impl TryFrom<&Face> for OutputFace {
    type Error = HandlerError;

    fn try_from(face: &Face) -> Result<Self, Self::Error> {
        let bbox = face
            .bounding_box()
            .ok_or(HandlerError::IncompleteFaceRecord("bounding box"))?;
        Ok(Self {
            bounding_box: BoundingBox {
                height: required(bbox.height(), "bounding box height")?,
                left: required(bbox.left(), "bounding box left")?,
                top: required(bbox.top(), "bounding box top")?,
                width: required(bbox.width(), "bounding box width")?,
            },
            confidence: required(face.confidence(), "confidence")?,
            face_id: face
                .face_id()
                .ok_or(HandlerError::IncompleteFaceRecord("face id"))?
                .to_owned(),
            image_id: face
                .image_id()
                .ok_or(HandlerError::IncompleteFaceRecord("image id"))?
                .to_owned(),
        })
    }
}

fn required(value: Option<f32>, field: &'static str) -> Result<f64, HandlerError> {
    value
        .map(widen)
        .ok_or(HandlerError::IncompleteFaceRecord(field))
}

// Go through the shortest decimal form so 0.1_f32 comes out as 0.1, not 0.10000000149011612.
fn widen(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(f64::from(value))
}

/// Headroom kept before the platform deadline so a timeout can still be reported.
const DEADLINE_RESERVE: Duration = Duration::from_millis(500);

/// Time left for the remote call before the runtime kills the invocation.
/// `None` when the context carries no deadline.
fn time_remaining(context: &Context) -> Option<Duration> {
    if context.deadline == 0 {
        return None;
    }
    let deadline = UNIX_EPOCH + Duration::from_millis(context.deadline);
    let remaining = deadline
        .duration_since(SystemTime::now())
        .unwrap_or(Duration::ZERO);
    Some(remaining.saturating_sub(DEADLINE_RESERVE))
}

/// Failed calls are surfaced to the invoker as they are, so SDK retries are
/// switched off on the production client.
pub(crate) fn without_retries(builder: RekognitionConfigBuilder) -> RekognitionConfigBuilder {
    builder.retry_config(RetryConfig::disabled())
}

/// Indexes the faces found in the referenced image and returns the first one.
pub(crate) async fn index_first_face(
    client: &RekognitionClient,
    config: &Config,
    input: &InputEvent,
) -> Result<OutputFace, HandlerError> {
    let key = object_key::decode(&input.s3_key)?;
    index_decoded(client, config, &input.s3_bucket, &key).await
}

async fn index_decoded(
    client: &RekognitionClient,
    config: &Config,
    bucket: &str,
    key: &str,
) -> Result<OutputFace, HandlerError> {
    tracing::info!(
        bucket = %bucket,
        key = %key,
        collection = %config.collection_id,
        "Indexing faces"
    );
    let image = Image::builder()
        .s3_object(S3Object::builder().bucket(bucket).name(key).build())
        .build();
    let response = client
        .index_faces()
        .collection_id(&config.collection_id)
        .image(image)
        .send()
        .await
        .map_err(|e| {
            let message = DisplayErrorContext(&e).to_string();
            if config.collection_id.is_empty() {
                HandlerError::MissingCollection(message)
            } else {
                HandlerError::Index(message)
            }
        })?;

    let records = response.face_records();
    let record = records.first().ok_or_else(|| HandlerError::EmptyResult {
        bucket: bucket.to_owned(),
        key: key.to_owned(),
    })?;
    if records.len() > 1 {
        tracing::debug!(indexed = records.len(), "Returning the first indexed face");
    }
    let face = record
        .face()
        .ok_or(HandlerError::IncompleteFaceRecord("face"))?;
    OutputFace::try_from(face)
}

async fn handle(
    event: LambdaEvent<Trigger>,
    client: &RekognitionClient,
    config: &Config,
) -> Result<OutputFace, HandlerError> {
    let input = event.payload.into_input()?;
    let indexing = index_first_face(client, config, &input);
    match time_remaining(&event.context) {
        None => indexing.await,
        Some(remaining) if remaining.is_zero() => {
            // A bad key is reported as such even when no time is left.
            object_key::decode(&input.s3_key)?;
            Err(HandlerError::DeadlineExceeded)
        }
        Some(remaining) => tokio::time::timeout(remaining, indexing)
            .await
            .unwrap_or(Err(HandlerError::DeadlineExceeded)),
    }
}

fn report(
    request_id: &str,
    outcome: Result<OutputFace, HandlerError>,
) -> Result<OutputFace, Error> {
    match outcome {
        Ok(face) => {
            tracing::info!(
                request_id = %request_id,
                face_id = %face.face_id,
                image_id = %face.image_id,
                confidence = face.confidence,
                "Indexed face"
            );
            Ok(face)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to index face");
            Err(e.into())
        }
    }
}

pub(crate) async fn function_handler(
    event: LambdaEvent<Trigger>,
    client: &RekognitionClient,
    config: &Config,
) -> Result<OutputFace, Error> {
    let request_id = event.context.request_id.clone();
    report(&request_id, handle(event, client, config).await)
}

/// Per-invocation entry used by `main`: reads the configuration from the
/// environment on every call, then runs `function_handler`.
pub(crate) async fn handle_with_env(
    event: LambdaEvent<Trigger>,
    client: &RekognitionClient,
) -> Result<OutputFace, Error> {
    match Config::load() {
        Ok(config) => function_handler(event, client, &config).await,
        Err(e) => report(&event.context.request_id, Err(e.into())),
    }
}
