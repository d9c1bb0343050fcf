//! # Sync Coordinator
//!
//! Sequences one curation run.
//!
//! ## Workflow
//!
//! 1. Capture "now" once from the clock
//! 2. Load watermarks (and apply the debug override, if any)
//! 3. Scan followed-artist releases and/or source playlists
//! 4. Append the listen-later, sets and compilation buckets to their playlists
//! 5. Write the run report
//! 6. Advance the watermarks of the scanned categories
//!
//! Any error aborts the run at the point it happened. Watermarks are only
//! written by a run that got through every earlier step.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{RunOptions, SyncCoordinator};
//!
//! let coordinator = SyncCoordinator::new(config, catalog, Arc::new(SystemClock));
//! let summary = coordinator.run(RunOptions::new(true, true)).await?;
//! println!("{} tracks queued", summary.listen_later);
//! ```

use bridge_traits::catalog::{CatalogService, RemotePlaylist};
use bridge_traits::time::Clock;
use core_runtime::config::AppConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::artist_scanner::{ArtistReleaseScanner, ReleaseWindow};
use crate::error::{Result, SyncError};
use crate::model::Bucket;
use crate::pagination::Pager;
use crate::playlist_scanner::PlaylistTrackScanner;
use crate::report::RunReport;
use crate::run::{RunContext, RunOptions, RunPhase, RunSummary};
use crate::watermark::{RunWatermark, RunWatermarkStore, Watermark};
use crate::writer::PlaylistBatchWriter;

pub struct SyncCoordinator {
    config: AppConfig,
    catalog: Arc<dyn CatalogService>,
    clock: Arc<dyn Clock>,
}

impl SyncCoordinator {
    pub fn new(config: AppConfig, catalog: Arc<dyn CatalogService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            catalog,
            clock,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one curation pass.
    ///
    /// On error the run is aborted and the watermark file is left as it was,
    /// even if some playlist writes already went through.
    #[instrument(skip(self), fields(artists = options.scan_artists, playlists = options.scan_playlists))]
    pub async fn run(&self, options: RunOptions) -> Result<RunSummary> {
        let mut ctx = RunContext::new(self.clock.now());
        info!(run_id = %ctx.id, now = %ctx.now, "Starting curation run");

        match self.execute(&mut ctx, &options).await {
            Ok(summary) => {
                info!(
                    run_id = %ctx.id,
                    tracks = summary.tracks_discovered,
                    listen_later = summary.listen_later,
                    sets = summary.sets,
                    compilations = summary.compilations,
                    unplayable = summary.unplayable,
                    chunks = summary.chunks_written,
                    "Curation run complete"
                );
                Ok(summary)
            }
            Err(e) => {
                let failed_in = ctx.phase();
                ctx.abort();
                error!(run_id = %ctx.id, phase = %failed_in, error = %e, "Curation run aborted");
                Err(e)
            }
        }
    }

    async fn execute(&self, ctx: &mut RunContext, options: &RunOptions) -> Result<RunSummary> {
        let store = RunWatermarkStore::new(&self.config.last_run_path);
        let loaded = store.load().await?;
        let effective = self.effective_watermark(&loaded, options)?;
        ctx.advance(RunPhase::WatermarksLoaded)?;

        ctx.advance(RunPhase::Scanning {
            artists: options.scan_artists,
            playlists: options.scan_playlists,
        })?;
        if !options.scans_anything() {
            warn!("Neither artist nor playlist scan enabled, nothing to do");
        }

        if options.scan_artists {
            let window = ReleaseWindow::new(effective.artists.at(), ctx.now);
            ArtistReleaseScanner::new(self.catalog.as_ref(), &self.config.scan, window)
                .scan(&mut ctx.cache, &mut ctx.buckets)
                .await?;
        }

        if options.scan_playlists {
            PlaylistTrackScanner::new(
                self.catalog.as_ref(),
                &self.config.playlists,
                effective.playlists.at(),
            )
            .scan(&mut ctx.cache, &mut ctx.buckets)
            .await?;
        }

        if options.scan_artists {
            ctx.advance(RunPhase::Classifying)?;
            for bucket in Bucket::ALL {
                debug!(bucket = %bucket, tracks = ctx.buckets.len(bucket), "Bucket filled");
            }
        }

        ctx.advance(RunPhase::Writing)?;
        let chunks_written = self.write_buckets(ctx).await?;
        let report_path = self.write_report(ctx, &effective, options).await?;

        if options.scans_anything() {
            let next = loaded.advanced(ctx.now, options.scan_artists, options.scan_playlists);
            store.persist(&next).await?;
        }
        ctx.advance(RunPhase::WatermarksPersisted)?;
        ctx.advance(RunPhase::Done)?;

        Ok(ctx.summary(chunks_written, report_path, options))
    }

    fn effective_watermark(&self, loaded: &RunWatermark, options: &RunOptions) -> Result<RunWatermark> {
        let mut effective = loaded.clone();
        if let Some(raw) = options.watermark_override.as_deref() {
            let date = Watermark::parse(raw)?;
            effective.override_with(&date, options.scan_artists, options.scan_playlists);
            warn!(date = raw, "Watermark override in effect");
        }
        Ok(effective)
    }

    async fn write_buckets(&self, ctx: &RunContext) -> Result<usize> {
        let writer = PlaylistBatchWriter::new(self.catalog.as_ref());
        let destinations = [
            (Bucket::ListenLater, self.config.listen_later.as_str()),
            (Bucket::Sets, self.config.sets.as_str()),
            (Bucket::Compilations, self.config.compilation.as_str()),
        ];

        let mut chunks = 0;
        for (bucket, playlist_id) in destinations {
            chunks += writer
                .write(&ctx.cache, playlist_id, ctx.buckets.get(bucket))
                .await?;
        }
        Ok(chunks)
    }

    async fn write_report(
        &self,
        ctx: &RunContext,
        effective: &RunWatermark,
        options: &RunOptions,
    ) -> Result<Option<PathBuf>> {
        let Some(dir) = self.config.logs_path.as_deref() else {
            return Ok(None);
        };
        if !options.scans_anything() {
            return Ok(None);
        }

        let report = RunReport::build(
            &ctx.cache,
            &ctx.buckets,
            effective.artists.at(),
            effective.playlists.at(),
        );
        if report.is_empty() {
            debug!("No findings, skipping run report");
            return Ok(None);
        }
        report.write_to_dir(dir).await.map(Some)
    }

    /// Playlists the current user follows or owns.
    #[instrument(skip(self))]
    pub async fn followed_playlists(&self) -> Result<Vec<RemotePlaylist>> {
        let user = self
            .catalog
            .current_user()
            .await
            .map_err(|source| SyncError::Remote {
                operation: "current user".to_string(),
                source,
            })?;

        let catalog = self.catalog.as_ref();
        let user_id = user.id.as_str();
        Pager::new(format!("playlists of user {}", user.id), move |cursor| {
            catalog.list_user_playlists(user_id, cursor)
        })
        .collect_all()
        .await
    }
}
