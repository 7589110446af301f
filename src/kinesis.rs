//! Kinesis Data Streams operations over [`AwsClient`].
//!
//! Each operation builds its JSON body, names its `Kinesis_20131202.*`
//! target and hands the request to the client; signing, retry and error
//! classification all happen there.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::region::{Region, Service};
use crate::{AwsClient, AwsError, AwsRequest, Result};

const TARGET_PREFIX: &str = "Kinesis_20131202";

/// Kinesis endpoint bound to a client.
#[derive(Clone, Debug)]
pub struct KinesisService {
    client: AwsClient,
    endpoint: String,
}

impl KinesisService {
    /// Uses an explicit endpoint, e.g. a local emulator.
    pub fn new(client: AwsClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn for_region(client: AwsClient, region: Region) -> Self {
        let endpoint = region.endpoint(Service::Kinesis);
        Self::new(client, endpoint)
    }

    /// Uses the endpoint of the client's signing region.
    pub fn from_client(client: AwsClient) -> Result<Self> {
        let region = Region::require(client.region())?;
        Ok(Self::for_region(client, region))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Handle to an existing stream. Does not contact the service.
    pub fn stream(&self, name: impl Into<String>) -> Stream {
        Stream {
            name: name.into(),
            service: self.clone(),
        }
    }

    pub async fn create_stream(&self, name: &str, shard_count: u32) -> Result<Stream> {
        let input = CreateStreamInput {
            shard_count,
            stream_name: name,
        };
        self.client.send(self.request("CreateStream", &input)?).await?;
        Ok(self.stream(name))
    }

    /// Lists every stream, following `HasMoreStreams` pages.
    pub async fn list_streams(&self) -> Result<Vec<Stream>> {
        let mut streams = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let input = ListStreamsInput {
                exclusive_start_stream_name: start.as_deref(),
                limit: None,
            };
            let page: ListStreamsOutput = self
                .client
                .send_json(self.request("ListStreams", &input)?)
                .await?;

            start = page.stream_names.last().cloned();
            streams.extend(page.stream_names.into_iter().map(|name| self.stream(name)));

            if !page.has_more_streams || start.is_none() {
                return Ok(streams);
            }
        }
    }

    fn request<T: Serialize>(&self, operation: &str, input: &T) -> Result<AwsRequest> {
        let target = format!("{TARGET_PREFIX}.{operation}");
        Ok(AwsRequest::json(&self.endpoint, &target, input)?.service(Service::Kinesis.name()))
    }
}

/// A named Kinesis stream.
#[derive(Clone, Debug)]
pub struct Stream {
    name: String,
    service: KinesisService,
}

impl Stream {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Puts one record. `data` is base64 encoded on the wire.
    pub async fn put_record(&self, partition_key: &str, data: &[u8]) -> Result<()> {
        let input = PutRecordInput {
            data: STANDARD.encode(data),
            partition_key,
            stream_name: &self.name,
        };
        self.service
            .client
            .send(self.service.request("PutRecord", &input)?)
            .await?;
        Ok(())
    }

    pub async fn delete(&self) -> Result<()> {
        let input = StreamNameInput {
            stream_name: &self.name,
        };
        self.service
            .client
            .send(self.service.request("DeleteStream", &input)?)
            .await?;
        Ok(())
    }

    /// Describes the stream, collecting shards across `HasMoreShards` pages.
    pub async fn describe(&self) -> Result<StreamDescription> {
        let mut description: Option<StreamDescription> = None;
        loop {
            let input = DescribeStreamInput {
                exclusive_start_shard_id: description
                    .as_ref()
                    .and_then(|d| d.shards.last())
                    .map(|shard| shard.shard_id.as_str()),
                limit: None,
                stream_name: &self.name,
            };
            let page: DescribeStreamOutput = self
                .service
                .client
                .send_json(self.service.request("DescribeStream", &input)?)
                .await?;
            let page = page.stream_description;

            let merged = match description.take() {
                None => page,
                Some(mut acc) => {
                    acc.has_more_shards = page.has_more_shards;
                    acc.shards.extend(page.shards);
                    acc
                }
            };

            if !merged.has_more_shards || merged.shards.is_empty() {
                return Ok(merged);
            }
            description = Some(merged);
        }
    }

    pub async fn get_records(&self, input: &GetRecordsInput) -> Result<GetRecordsOutput> {
        self.service
            .client
            .send_json(self.service.request("GetRecords", input)?)
            .await
    }

    pub fn shard(&self, shard_id: impl Into<String>) -> Shard {
        Shard {
            id: shard_id.into(),
            stream: self.clone(),
        }
    }
}

/// A shard of a [`Stream`].
#[derive(Clone, Debug)]
pub struct Shard {
    id: String,
    stream: Stream,
}

impl Shard {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `starting_sequence_number` is only used by the `*SequenceNumber` iterator types.
    pub async fn get_shard_iterator(
        &self,
        iterator_type: ShardIteratorType,
        starting_sequence_number: Option<&str>,
    ) -> Result<String> {
        let input = GetShardIteratorInput {
            shard_id: &self.id,
            shard_iterator_type: iterator_type,
            starting_sequence_number,
            stream_name: &self.stream.name,
        };
        let service = &self.stream.service;
        let output: GetShardIteratorOutput = service
            .client
            .send_json(service.request("GetShardIterator", &input)?)
            .await?;
        Ok(output.shard_iterator)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShardIteratorType {
    AtSequenceNumber,
    AfterSequenceNumber,
    TrimHorizon,
    Latest,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamDescription {
    #[serde(default)]
    pub has_more_shards: bool,
    #[serde(default)]
    pub shards: Vec<ShardDescription>,
    #[serde(rename = "StreamARN")]
    pub stream_arn: String,
    pub stream_name: String,
    pub stream_status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShardDescription {
    #[serde(default)]
    pub adjacent_parent_shard_id: Option<String>,
    pub hash_key_range: HashKeyRange,
    #[serde(default)]
    pub parent_shard_id: Option<String>,
    pub sequence_number_range: SequenceNumberRange,
    pub shard_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HashKeyRange {
    pub ending_hash_key: String,
    pub starting_hash_key: String,
}

/// An open shard has no ending sequence number.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SequenceNumberRange {
    #[serde(default)]
    pub ending_sequence_number: Option<String>,
    pub starting_sequence_number: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRecordsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    pub shard_iterator: String,
}

impl GetRecordsInput {
    pub fn new(shard_iterator: impl Into<String>) -> Self {
        Self {
            limit: None,
            shard_iterator: shard_iterator.into(),
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRecordsOutput {
    /// `None` once the shard is closed and fully read.
    #[serde(default)]
    pub next_shard_iterator: Option<String>,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub millis_behind_latest: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    /// Base64 data blob as sent by the service.
    pub data: String,
    pub partition_key: String,
    pub sequence_number: String,
}

impl Record {
    pub fn decode_data(&self) -> Result<Vec<u8>> {
        STANDARD.decode(&self.data).map_err(|err| {
            AwsError::Decode(format!(
                "record {} has invalid base64 data: {err}",
                self.sequence_number
            ))
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateStreamInput<'a> {
    shard_count: u32,
    stream_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StreamNameInput<'a> {
    stream_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListStreamsInput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    exclusive_start_stream_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListStreamsOutput {
    #[serde(default)]
    has_more_streams: bool,
    #[serde(default)]
    stream_names: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutRecordInput<'a> {
    data: String,
    partition_key: &'a str,
    stream_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStreamInput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    exclusive_start_shard_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    stream_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStreamOutput {
    stream_description: StreamDescription,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetShardIteratorInput<'a> {
    shard_id: &'a str,
    shard_iterator_type: ShardIteratorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    starting_sequence_number: Option<&'a str>,
    stream_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetShardIteratorOutput {
    shard_iterator: String,
}
