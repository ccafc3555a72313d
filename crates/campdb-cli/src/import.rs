//! The `import` subcommand: validate a schedule workbook from disk.
//!
//! Prints the same per-row report the API's import endpoint produces. Without
//! `--commit` nothing is written, so the command doubles as a dry run for
//! spreadsheets before they are uploaded.

use std::path::Path;

use campdb_import::{parse_schedule_workbook, summarize, InfluencerRef, ParsedScheduleRow};
use uuid::Uuid;

pub(crate) async fn run_import(
    pool: &sqlx::PgPool,
    file: &Path,
    campaign: Uuid,
    commit: bool,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", file.display()))?;

    let campaign = campdb_db::get_campaign(pool, campaign)
        .await?
        .ok_or_else(|| anyhow::anyhow!("campaign not found"))?;

    let roster: Vec<InfluencerRef> = campdb_db::list_campaign_influencers(pool, campaign.id)
        .await?
        .into_iter()
        .map(|i| InfluencerRef {
            id: i.id,
            name: i.name,
        })
        .collect();
    if roster.is_empty() {
        tracing::warn!(campaign = %campaign.public_id, "campaign has no influencer roster");
    }

    let rows = parse_schedule_workbook(&bytes, &roster)?;
    let summary = summarize(&rows);

    for row in &rows {
        print_row(row);
    }
    println!(
        "\n{} row(s): {} valid, {} invalid ({:.1}% valid)",
        summary.total, summary.valid, summary.invalid, summary.valid_percent
    );

    if !commit {
        println!("dry run; pass --commit to insert the valid rows");
        return Ok(());
    }

    let drafts: Vec<campdb_db::NewSchedule> = rows
        .iter()
        .filter(|r| r.is_valid)
        .map(|r| to_new_schedule(campaign.id, r))
        .collect();
    let inserted = campdb_db::insert_schedule_drafts(pool, &drafts).await?;
    println!("inserted {inserted} schedule(s) into campaign {}", campaign.public_id);

    Ok(())
}

/// Valid rows carry every required field; the importer guarantees it.
fn to_new_schedule(campaign_id: i64, row: &ParsedScheduleRow) -> campdb_db::NewSchedule {
    let draft = &row.draft;
    campdb_db::NewSchedule {
        campaign_id,
        influencer_id: draft.influencer_id.unwrap_or_default(),
        title: draft.title.clone().unwrap_or_default(),
        description: draft.description.clone(),
        platform: draft
            .platform
            .map(|p| p.to_string())
            .unwrap_or_default(),
        content_type: draft.content_type.clone().unwrap_or_default(),
        scheduled_date: draft.scheduled_date.unwrap_or_default(),
        objectives: serde_json::json!([]),
        budget: None,
    }
}

fn print_row(row: &ParsedScheduleRow) {
    if row.is_valid {
        let title = row.draft.title.as_deref().unwrap_or("");
        let name = row.draft.influencer_name.as_deref().unwrap_or("");
        println!("row {:>4}  ok      {title} ({name})", row.row);
        return;
    }
    println!("row {:>4}  invalid", row.row);
    for error in &row.errors {
        println!("          {}: {}", error.field, error.message);
    }
}
