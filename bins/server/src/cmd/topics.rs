use topic_engine::{MessagePublisher, TopicDirectory, TopicProvisioner};

use super::{build_context, flush_producer};
use crate::config::Effective;
use crate::error::ServerError;

/// `topics`: one name per line, reserved ones included.
pub async fn list(eff: &Effective) -> Result<(), ServerError> {
    let ctx = build_context(eff)?;
    for topic in TopicDirectory::new(ctx).list_topics().await? {
        println!("{topic}");
    }
    Ok(())
}

pub async fn create(eff: &Effective, topic: &str) -> Result<(), ServerError> {
    let ctx = build_context(eff)?;
    for result in TopicProvisioner::new(ctx).create_topic(topic).await? {
        println!("TOPIC: {result}");
    }
    Ok(())
}

pub async fn send(eff: &Effective, topic: &str, message: &str) -> Result<(), ServerError> {
    let ctx = build_context(eff)?;
    MessagePublisher::new(ctx.clone()).publish(topic, message).await?;
    // The process exits right after; deliver before that.
    flush_producer(&ctx).await;
    println!("message sent to kafka");
    Ok(())
}
