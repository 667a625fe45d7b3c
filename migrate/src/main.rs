//! # Vote-field Migration
//!
//! One-shot rewrite of stored meetings to the canonical vote-ownership
//! field.
//!
//! Old documents recorded a vote's owner under `voterId`; the canonical
//! field is `participantId`. Deserializing through the engine types accepts
//! either spelling, so the migration is: read every meeting, let serde
//! normalize it, drop any duplicate votes that accumulated while both
//! spellings were live (keeping the most recent per participant), and write
//! the document back. Run it once per database; after that the alias path in
//! the engine only ever sees canonical data.

use anyhow::Result;
use bson::doc;
use clap::Parser;
use engine::meeting::Meeting;
use futures::stream::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use mongodb::{Client, Collection};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// MongoDB connection string.
    #[arg(long, default_value = "mongodb://127.0.0.1:27017")]
    mongo_url: String,

    /// Database holding the meetings collection.
    #[arg(long, default_value = "gavel")]
    mongo_db: String,

    /// Walk and report without writing anything back.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let client = Client::with_uri_str(&args.mongo_url).await?;
    let meetings: Collection<Meeting> = client.database(&args.mongo_db).collection("meetings");

    let total = meetings.count_documents(doc! {}).await?;
    println!("Loaded Meetings: {total}\n");

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let mut rewritten = 0usize;
    let mut duplicates_dropped = 0usize;

    let mut cursor = meetings.find(doc! {}).await?;
    while let Some(mut meeting) = cursor.try_next().await? {
        pb.set_message(format!("Meeting {}", meeting.code));

        let mut dropped = 0;
        for motion in &mut meeting.motions {
            dropped += motion.votes.dedup_latest();
        }

        if !args.dry_run {
            meetings
                .replace_one(doc! { "_id": meeting.id }, &meeting)
                .await?;
        }

        rewritten += 1;
        duplicates_dropped += dropped;
        pb.inc(1);
    }

    pb.finish_with_message("Done");

    println!("\nMeetings rewritten: {rewritten}");
    println!("Duplicate votes dropped: {duplicates_dropped}");

    if args.dry_run {
        println!("Dry run, nothing was written.");
    }

    Ok(())
}
