//! `mergelog` binary.
//!
//! `mergelog ingest <FROM_DATE> <ORG>` records every pull request of `ORG`
//! merged since `FROM_DATE` that the database does not already hold, writing
//! the new rows to the CSV report and the SQLite store. `mergelog report`
//! prints stored rows back as CSV.

use std::process::ExitCode;

use clap::Parser;
use mergelog_cli::{
  RunError,
  cli::{Cli, Command, IngestArgs, ReportArgs},
  logging,
  report::{ReportSink, open_existing},
  run::{RunOptions, github_client, run},
  settings::Settings,
};
use mergelog_core::{
  session::SessionContext,
  store::{RecordQuery, RecordStore},
};
use mergelog_store_sqlite::SqliteStore;
use tracing::{Instrument as _, error, info, info_span};

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  let settings = match Settings::load(&cli.config) {
    Ok(settings) => cli.apply(settings),
    Err(e) => {
      eprintln!("{e}");
      return ExitCode::from(e.exit_code());
    }
  };

  let result = match cli.command {
    Command::Ingest(args) => ingest(args, settings).await,
    Command::Report(args) => report(args, settings).await,
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      if tracing::dispatcher::has_been_set() {
        error!("{e}");
      } else {
        eprintln!("{e}");
      }
      ExitCode::from(e.exit_code())
    }
  }
}

async fn ingest(args: IngestArgs, settings: Settings) -> Result<(), RunError> {
  let client = github_client(args.token.as_deref(), &settings)?;
  let session = SessionContext::new(Some(args.from_date));
  let log_file = logging::init(&settings.log_dir, &session)
    .map_err(|e| RunError::Usage(format!("{e:#}")))?;

  let span = info_span!("run", session_id = %session.id());
  async move {
    info!(
      log_file = %log_file.display(),
      cutoff = %session.cutoff(),
      organization = %args.organization,
      "session started"
    );

    let login = client.authenticate().await?;
    info!(%login, "authenticated with GitHub");

    let store = if args.dry_run {
      info!("dry run: database is neither read nor written");
      None
    } else {
      Some(SqliteStore::open(&settings.database_path).await?)
    };

    let org = client.organization(&args.organization).await?;
    let members = client.member_count(&args.organization).await?;
    info!(
      organization = %org.login,
      name = org.display_name(),
      members,
      public_repos = org.public_repos,
      "fetching pull requests"
    );

    let file = std::fs::File::create(&settings.output_path)?;
    let options = RunOptions {
      organization:       args.organization,
      include_not_merged: args.include_not_merged,
      concurrency:        settings.concurrency,
      channel_capacity:   settings.channel_capacity,
    };
    let summary = run(client, store.as_ref(), &session, &options, file).await?;

    info!(
      path = %settings.output_path.display(),
      rows = summary.report.rows,
      "csv written"
    );
    Ok(())
  }
  .instrument(span)
  .await
}

async fn report(args: ReportArgs, settings: Settings) -> Result<(), RunError> {
  logging::init_console();

  let store = open_existing(&settings.database_path).await?;
  let query = RecordQuery {
    repository:   args.repo,
    merged_by:    args.merged_by,
    merged_after: args.since,
    session_id:   args.session,
    limit:        args.limit,
  };
  let rows = store.list(&query).await?;

  let mut sink = ReportSink::<SqliteStore, _>::new(std::io::stdout().lock())?;
  for row in &rows {
    sink.write(&row.record).await?;
  }
  sink.finish()?;
  Ok(())
}
