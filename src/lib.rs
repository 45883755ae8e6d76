//! Generates and manages the infrastructure for receiving webhooks with AWS
//! API Gateway and pushing them to SQS queues through a Lambda function.

pub mod aws;
pub mod config;
pub mod function;
pub mod generator;
pub mod logging;
pub mod terraform;
pub mod writer;
