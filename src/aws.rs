use aws_config::meta::region::RegionProviderChain;
use aws_sdk_cloudwatchlogs::model::OrderBy;
use aws_types::region::Region;
use aws_types::SdkConfig;
use chrono::{TimeZone, Utc};
use futures::future::try_join_all;
use tracing::debug;

/// SQS will not hand out more than this many messages per receive call.
pub const MAX_RECEIVE_COUNT: i32 = 10;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Unable to determine the AWS region; set AWS_REGION or `aws_region` in the configuration")]
    NoRegion,

    #[error("Malformed principal ARN: {0}")]
    MalformedArn(String),

    #[error("Service error ocurred: {0}.")]
    ServiceError(String),

    #[error("Queue {0} not found")]
    QueueNotFound(String),
}

/// Loads the shared SDK configuration. An explicit region wins over the
/// default provider chain, so every client built from the result agrees on
/// the region.
pub async fn sdk_config(region_override: Option<&str>) -> SdkConfig {
    let region = RegionProviderChain::first_try(
        region_override.map(|region| Region::new(region.to_string())),
    )
    .or_default_provider();

    aws_config::from_env().region(region).load().await
}

/// The account and region that every ARN and endpoint URL is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: String,
    pub region: String,
}

impl Identity {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
        }
    }

    /// Looks up the calling principal once. Generation cannot proceed
    /// without it, so any failure here is fatal to the caller.
    pub async fn resolve(sdk_config: &SdkConfig) -> Result<Self, Error> {
        let region = sdk_config
            .region()
            .ok_or(Error::NoRegion)?
            .as_ref()
            .to_string();
        debug!("Resolved AWS region: {}", region);

        let client = aws_sdk_sts::Client::new(sdk_config);
        let result = client
            .get_caller_identity()
            .send()
            .await
            .map_err(|error| Error::ServiceError(error.to_string()))?;

        let arn = result
            .arn()
            .ok_or_else(|| Error::MalformedArn(String::from("<none>")))?;
        let account_id = account_from_arn(arn)?;
        debug!("Resolved AWS account {} from {}", account_id, arn);

        return Ok(Self::new(account_id, region));
    }

    /// `arn:aws:<service>:<region>:<account>:<resource>`
    pub fn arn(&self, service: &str, resource: &str) -> String {
        format!(
            "arn:aws:{}:{}:{}:{}",
            service, self.region, self.account_id, resource
        )
    }
}

/// The account id is the fifth `:`-separated field of a principal ARN.
pub fn account_from_arn(arn: &str) -> Result<String, Error> {
    match arn.split(':').nth(4) {
        Some(account) if !account.is_empty() => Ok(account.to_string()),
        _ => Err(Error::MalformedArn(arn.to_string())),
    }
}

/// Read-only views of the deployed function's logs and queues.
pub struct AwsInfo {
    logs: aws_sdk_cloudwatchlogs::Client,
    sqs: aws_sdk_sqs::Client,
}

impl AwsInfo {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            logs: aws_sdk_cloudwatchlogs::Client::new(sdk_config),
            sqs: aws_sdk_sqs::Client::new(sdk_config),
        }
    }

    /// Prints the `count` latest events of the function's log group,
    /// walking streams from the most recently written one.
    pub async fn show_cloudwatch_logs(&self, function_name: &str, count: i32) -> Result<(), Error> {
        let group_name = format!("/aws/lambda/{}", function_name);
        debug!("Log Group Name: {}", group_name);

        let streams = self
            .logs
            .describe_log_streams()
            .log_group_name(&group_name)
            .order_by(OrderBy::LastEventTime)
            .descending(true)
            .limit(count)
            .send()
            .await
            .map_err(|error| Error::ServiceError(error.to_string()))?;
        let streams = streams.log_streams().unwrap_or_default();
        debug!("Found {} log streams", streams.len());

        let mut shown = 0;
        for stream in streams {
            if count - shown < 1 {
                break;
            }
            let stream_name = match stream.log_stream_name() {
                Some(name) => name,
                None => continue,
            };
            shown += self
                .show_log_stream(&group_name, stream_name, count - shown)
                .await?;
        }

        return Ok(());
    }

    async fn show_log_stream(
        &self,
        group_name: &str,
        stream_name: &str,
        max_count: i32,
    ) -> Result<i32, Error> {
        debug!("Showing up to {} events from stream {}", max_count, stream_name);
        let result = self
            .logs
            .get_log_events()
            .log_group_name(group_name)
            .log_stream_name(stream_name)
            .limit(max_count)
            .start_from_head(false)
            .send()
            .await
            .map_err(|error| Error::ServiceError(error.to_string()))?;

        let events = result.events().unwrap_or_default();
        if !events.is_empty() {
            println!("## Log Group '{}'; Log Stream '{}'", group_name, stream_name);
        }
        for event in events {
            println!(
                "{}",
                format_log_event(event.timestamp().unwrap_or(0), event.message().unwrap_or(""))
            );
        }

        debug!("displayed {} events from stream", events.len());
        return Ok(events.len() as i32);
    }

    /// Prints up to `count` messages from each queue without consuming
    /// them, unless `delete` is set.
    pub async fn show_queues(&self, queues: &[String], count: i32, delete: bool) -> Result<(), Error> {
        let urls = try_join_all(queues.iter().map(|queue| self.queue_url(queue))).await?;

        for (queue, url) in queues.iter().zip(urls) {
            self.show_queue(queue, &url, count, delete).await?;
        }

        return Ok(());
    }

    async fn queue_url(&self, queue: &str) -> Result<String, Error> {
        let result = self
            .sqs
            .get_queue_url()
            .queue_name(queue)
            .send()
            .await
            .map_err(|error| Error::ServiceError(error.to_string()))?;

        match result.queue_url() {
            Some(url) => Ok(url.to_string()),
            None => Err(Error::QueueNotFound(queue.to_string())),
        }
    }

    async fn show_queue(&self, queue: &str, url: &str, count: i32, delete: bool) -> Result<(), Error> {
        debug!("Receiving up to {} messages from {}", count, url);
        let result = self
            .sqs
            .receive_message()
            .queue_url(url)
            .max_number_of_messages(count.clamp(1, MAX_RECEIVE_COUNT))
            .visibility_timeout(0)
            .wait_time_seconds(0)
            .send()
            .await
            .map_err(|error| Error::ServiceError(error.to_string()))?;

        let messages = result.messages().unwrap_or_default();
        println!("=> Queue '{}' ({} messages)", queue, messages.len());
        for message in messages {
            println!(
                "{}",
                format_message(message.message_id().unwrap_or("?"), message.body().unwrap_or(""))
            );

            if !delete {
                continue;
            }
            if let Some(handle) = message.receipt_handle() {
                self.sqs
                    .delete_message()
                    .queue_url(url)
                    .receipt_handle(handle)
                    .send()
                    .await
                    .map_err(|error| Error::ServiceError(error.to_string()))?;
                println!("Deleted message {}", message.message_id().unwrap_or("?"));
            }
        }

        return Ok(());
    }
}

fn format_log_event(timestamp_millis: i64, message: &str) -> String {
    let time = match Utc.timestamp_millis_opt(timestamp_millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => timestamp_millis.to_string(),
    };
    format!("{} => {}", time, message.trim())
}

fn format_message(message_id: &str, body: &str) -> String {
    let body = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    };
    format!("== Message {}\n{}", message_id, body)
}
