use awsjson_http::{
    kinesis::{GetRecordsInput, KinesisService, ShardIteratorType},
    AwsClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let stream_name = std::env::var("KINESIS_STREAM")?;

    let client = AwsClient::from_env()?;
    let kinesis = KinesisService::from_client(client)?;
    let stream = kinesis.stream(stream_name);

    stream.put_record("demo", b"Hello world!").await?;

    let description = stream.describe().await?;
    println!("{} is {}", description.stream_name, description.stream_status);

    for shard in &description.shards {
        let iterator = stream
            .shard(shard.shard_id.as_str())
            .get_shard_iterator(ShardIteratorType::TrimHorizon, None)
            .await?;

        let output = stream
            .get_records(&GetRecordsInput::new(iterator).with_limit(10))
            .await?;
        for record in output.records {
            let data = record.decode_data()?;
            println!(
                "{} {}: {}",
                shard.shard_id,
                record.sequence_number,
                String::from_utf8_lossy(&data)
            );
        }
    }

    Ok(())
}
