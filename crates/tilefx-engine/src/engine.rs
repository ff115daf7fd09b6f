//! The filter application engine.

use std::collections::HashMap;
use std::sync::Arc;

use tilefx_core::PixelBuffer;
use tracing::{debug, trace};

use crate::chain::{ChainRun, ChainState, Completion};
use crate::config::Configuration;
use crate::{
    ConfigError, ConfigResult, FilterSpec, ItemId, LoadMode, RenderedRegion, Scope,
    TileFilterCache, TileId, TileProcessor,
};

/// The viewer collaborator: tile lifecycle control the engine consumes but
/// does not own.
pub trait ViewerHost {
    /// Redraw the whole viewport unconditionally.
    fn force_full_redraw(&mut self);

    /// Throw away the item's loaded tiles so they re-decode (and re-enter
    /// the engine through the load path).
    fn reset_item(&mut self, item: ItemId);

    /// Every tiled image currently in the world, in display order.
    fn items(&self) -> Vec<ItemId>;
}

/// Owns the live filter configuration and the per-tile filtering protocol.
///
/// See the crate docs for the protocol overview. All methods run on the
/// viewer's thread; the version counter is the only cancellation primitive.
pub struct FilterEngine<V: ViewerHost> {
    viewer: V,
    config: Configuration,
    /// Engine-owned filtered results awaiting their first matching draw.
    tile_results: HashMap<TileId, TileFilterCache>,
    /// In-flight asynchronous chains, advanced by [`pump`](Self::pump).
    pending: Vec<ChainRun>,
}

impl<V: ViewerHost> FilterEngine<V> {
    /// Create an engine with an empty configuration (version 0, no filters).
    pub fn new(viewer: V) -> Self {
        Self {
            viewer,
            config: Configuration::default(),
            tile_results: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Current configuration version. Starts at 0; each successful
    /// [`install`](Self::install) advances it by exactly one.
    pub fn version(&self) -> u64 {
        self.config.version
    }

    /// Borrow the viewer collaborator.
    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    /// Mutably borrow the viewer collaborator.
    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.viewer
    }

    /// Install (or replace) the filter configuration.
    ///
    /// Validates before mutating anything: every spec must declare at least
    /// one processor, and no item may appear in more than one item set.
    /// On failure the previous configuration stays fully in effect - no
    /// version bump, no redraw, no resets.
    ///
    /// On success the new snapshot and version are published first, then
    /// `Sync` triggers exactly one full redraw while `Async` resets each
    /// affected item exactly once (all items when any spec is global).
    pub fn install(&mut self, specs: Vec<FilterSpec>, mode: LoadMode) -> ConfigResult<()> {
        let mut scoped_items: Vec<ItemId> = Vec::new();
        let mut has_global = false;
        for spec in &specs {
            if spec.processors.is_empty() {
                return Err(ConfigError::MissingProcessors);
            }
            match &spec.scope {
                Scope::Global => has_global = true,
                Scope::Items(items) => {
                    for &item in items {
                        if scoped_items.contains(&item) {
                            return Err(ConfigError::ItemReused(item));
                        }
                        scoped_items.push(item);
                    }
                }
            }
        }

        // Publish the new snapshot before any side effect so every
        // continuation boundary observes the bumped version.
        self.config = Configuration {
            specs,
            version: self.config.version + 1,
        };
        debug!(
            version = self.config.version,
            specs = self.config.specs.len(),
            ?mode,
            "installed filter configuration"
        );

        match mode {
            LoadMode::Sync => self.viewer.force_full_redraw(),
            LoadMode::Async => {
                let to_reset = if has_global {
                    self.viewer.items()
                } else {
                    scoped_items
                };
                for item in to_reset {
                    self.viewer.reset_item(item);
                }
            }
        }
        Ok(())
    }

    /// Ordered processors applying to a tile of `item`.
    ///
    /// Global-scope processors accumulate in configuration order, but the
    /// first item-scoped spec whose set contains `item` overrides them
    /// entirely and is returned verbatim (first match wins). An empty result
    /// means the tile passes through untouched: no tagging, no caching.
    pub fn processors_for(&self, item: ItemId) -> Vec<Arc<dyn TileProcessor>> {
        let mut globals: Vec<Arc<dyn TileProcessor>> = Vec::new();
        for spec in &self.config.specs {
            match &spec.scope {
                Scope::Global => globals.extend(spec.processors.iter().cloned()),
                Scope::Items(items) => {
                    if items.contains(&item) {
                        return spec.processors.clone();
                    }
                }
            }
        }
        globals
    }

    /// Handle a tile finishing decode.
    ///
    /// If any processors apply, the decoded image is copied into a private
    /// buffer and an asynchronous chain stamped with the current version is
    /// enqueued; the first processor runs immediately (the decode event is
    /// the chain's trigger), the rest advance via [`pump`](Self::pump).
    /// The viewer's completion continuation is held until the chain
    /// finishes and is never invoked if the chain goes stale.
    ///
    /// With no applicable processors this is a no-op and the completion is
    /// dropped unused (the viewer treats an unclaimed continuation as
    /// already complete).
    pub fn on_tile_loaded(
        &mut self,
        tile: TileId,
        image: &PixelBuffer,
        item: ItemId,
        completion: Option<Completion>,
    ) {
        let processors = self.processors_for(item);
        if processors.is_empty() {
            return;
        }
        trace!(tile = tile.0, count = processors.len(), "tile loaded, filtering");

        match completion {
            Some(completion) => {
                let mut chain = ChainRun::new(
                    tile,
                    image.clone(),
                    processors,
                    self.config.version,
                    Some(completion),
                );
                // Step 0 runs off the decode event itself; later steps are
                // continuation boundaries.
                chain.tick(self.config.version);
                self.pending.push(chain);
            }
            None => {
                // Synchronous caller: back-to-back, no cancellation points.
                let mut buffer = image.clone();
                for p in &processors {
                    p.apply(&mut buffer);
                }
                self.tile_results.insert(
                    tile,
                    TileFilterCache {
                        buffer,
                        computed_at: self.config.version,
                    },
                );
            }
        }
    }

    /// Advance every pending chain by one continuation step.
    ///
    /// Returns the number of chains still pending. Chains whose captured
    /// version no longer matches abort silently; finished chains install
    /// their result into the tile cache and invoke the held completion.
    pub fn pump(&mut self) -> usize {
        let mut i = 0;
        while i < self.pending.len() {
            match self.pending[i].tick(self.config.version) {
                ChainState::Running => i += 1,
                ChainState::Stale => {
                    self.pending.remove(i);
                }
                ChainState::Done => {
                    let chain = self.pending.remove(i);
                    trace!(tile = chain.tile.0, version = chain.expected, "chain complete");
                    self.tile_results.insert(
                        chain.tile,
                        TileFilterCache {
                            buffer: chain.buffer,
                            computed_at: chain.expected,
                        },
                    );
                    if let Some(completion) = chain.completion {
                        completion();
                    }
                }
            }
        }
        self.pending.len()
    }

    /// Pump until no chains remain pending.
    pub fn run_pending(&mut self) {
        while self.pump() > 0 {}
    }

    /// Whether any asynchronous chains are still in flight.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The cached filtered result for a tile, if one is waiting.
    pub fn cached_result(&self, tile: TileId) -> Option<&TileFilterCache> {
        self.tile_results.get(&tile)
    }

    /// Handle a tile being drawn.
    ///
    /// Idempotent per version: a region already tagged with the current
    /// version is left alone. Otherwise the region is restored to its
    /// pristine bytes, then either blitted from a version-matching cached
    /// result (consuming the cache entry) or re-filtered synchronously on
    /// the spot, and finally tagged with the current version.
    pub fn on_tile_drawing(&mut self, tile: TileId, region: &mut RenderedRegion, item: ItemId) {
        let version = self.config.version;
        if region.filtered_at == Some(version) {
            return;
        }

        let processors = self.processors_for(item);
        if processors.is_empty() {
            // Un-filter: put the pristine bytes back, exactly.
            if let Some(pristine) = region.pristine.take() {
                region.buffer = pristine;
            }
            region.filtered_at = Some(version);
            return;
        }

        match &region.pristine {
            Some(pristine) => {
                // Region was filtered under an older version; start over
                // from the pristine copy.
                let pristine = pristine.clone();
                region.buffer = pristine;
            }
            None => region.pristine = Some(region.buffer.clone()),
        }

        if let Some(cached) = self.tile_results.remove(&tile) {
            // A decode-time result only short-circuits the draw when it was
            // computed under the current version and actually fits the
            // region; anything else is stale and is dropped here.
            if cached.computed_at == version
                && cached.buffer.dimensions() == region.buffer.dimensions()
            {
                region.buffer = cached.buffer;
                region.filtered_at = Some(version);
                return;
            }
            trace!(tile = tile.0, computed_at = cached.computed_at, version, "stale cache dropped");
        }

        for p in &processors {
            p.apply(&mut region.buffer);
        }
        region.filtered_at = Some(version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use tilefx_ops::{brightness, invert};

    /// Records every collaborator call the engine makes.
    #[derive(Default)]
    struct MockViewer {
        redraws: usize,
        resets: Vec<ItemId>,
        world: Vec<ItemId>,
    }

    impl ViewerHost for MockViewer {
        fn force_full_redraw(&mut self) {
            self.redraws += 1;
        }

        fn reset_item(&mut self, item: ItemId) {
            self.resets.push(item);
        }

        fn items(&self) -> Vec<ItemId> {
            self.world.clone()
        }
    }

    fn engine() -> FilterEngine<MockViewer> {
        FilterEngine::new(MockViewer::default())
    }

    fn proc(p: tilefx_ops::CpuFilter) -> Arc<dyn TileProcessor> {
        Arc::new(p)
    }

    fn buf(v: u8) -> PixelBuffer {
        PixelBuffer::filled(4, 4, [v, v, v, 255]).unwrap()
    }

    #[test]
    fn test_install_bumps_version_by_one() {
        let mut e = engine();
        assert_eq!(e.version(), 0);
        e.install(vec![FilterSpec::global(vec![proc(invert())])], LoadMode::Sync)
            .unwrap();
        assert_eq!(e.version(), 1);
        e.install(vec![], LoadMode::Sync).unwrap();
        assert_eq!(e.version(), 2);
    }

    #[test]
    fn test_install_rejects_empty_processors() {
        let mut e = engine();
        let err = e
            .install(
                vec![FilterSpec::for_items(vec![ItemId(1)], vec![])],
                LoadMode::Sync,
            )
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingProcessors);
        // Previous (empty) configuration stays in effect.
        assert_eq!(e.version(), 0);
        assert_eq!(e.viewer().redraws, 0);
    }

    #[test]
    fn test_item_reuse_is_all_or_nothing() {
        let mut e = engine();
        let specs = vec![
            FilterSpec::for_items(vec![ItemId(1), ItemId(2)], vec![proc(invert())]),
            FilterSpec::for_items(vec![ItemId(2)], vec![proc(invert())]),
        ];
        let err = e.install(specs, LoadMode::Async).unwrap_err();
        assert_eq!(err, ConfigError::ItemReused(ItemId(2)));
        // No reset happened for any item, not even ItemId(1).
        assert!(e.viewer().resets.is_empty());
        assert_eq!(e.version(), 0);
    }

    #[test]
    fn test_sync_mode_one_redraw_no_resets() {
        let mut e = engine();
        e.install(
            vec![FilterSpec::global(vec![proc(brightness(50).unwrap())])],
            LoadMode::Sync,
        )
        .unwrap();
        assert_eq!(e.viewer().redraws, 1);
        assert!(e.viewer().resets.is_empty());
    }

    #[test]
    fn test_async_mode_resets_each_item_once() {
        let mut e = engine();
        e.install(
            vec![
                FilterSpec::for_items(vec![ItemId(3)], vec![proc(invert())]),
                FilterSpec::for_items(vec![ItemId(7)], vec![proc(invert())]),
            ],
            LoadMode::Async,
        )
        .unwrap();
        assert_eq!(e.viewer().resets, vec![ItemId(3), ItemId(7)]);
        assert_eq!(e.viewer().redraws, 0);
    }

    #[test]
    fn test_async_global_resets_whole_world() {
        let mut e = engine();
        e.viewer_mut().world = vec![ItemId(1), ItemId(2), ItemId(3)];
        e.install(
            vec![
                FilterSpec::for_items(vec![ItemId(2)], vec![proc(invert())]),
                FilterSpec::global(vec![proc(invert())]),
            ],
            LoadMode::Async,
        )
        .unwrap();
        // Global short-circuits enumeration: the full item set, once each.
        assert_eq!(e.viewer().resets, vec![ItemId(1), ItemId(2), ItemId(3)]);
    }

    #[test]
    fn test_item_scope_overrides_globals() {
        let mut e = engine();
        let item_proc = proc(brightness(10).unwrap());
        e.install(
            vec![
                FilterSpec::global(vec![proc(invert())]),
                FilterSpec::for_items(vec![ItemId(5)], vec![item_proc]),
                FilterSpec::global(vec![proc(invert())]),
            ],
            LoadMode::Sync,
        )
        .unwrap();

        // Scoped item: its spec's processors verbatim, globals ignored.
        let scoped = e.processors_for(ItemId(5));
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name(), "brightness");

        // Unscoped item: all globals in configuration order.
        let unscoped = e.processors_for(ItemId(99));
        assert_eq!(unscoped.len(), 2);

        // No specs at all: empty resolution.
        e.install(vec![], LoadMode::Sync).unwrap();
        assert!(e.processors_for(ItemId(5)).is_empty());
    }

    #[test]
    fn test_load_runs_chain_and_caches_at_version() {
        let mut e = engine();
        e.install(vec![FilterSpec::global(vec![proc(invert())])], LoadMode::Sync)
            .unwrap();

        let completed = Rc::new(RefCell::new(false));
        let flag = completed.clone();
        e.on_tile_loaded(
            TileId(1),
            &buf(100),
            ItemId(1),
            Some(Box::new(move || *flag.borrow_mut() = true)),
        );
        assert!(e.has_pending());
        assert!(!*completed.borrow());

        e.run_pending();
        assert!(*completed.borrow());
        let cached = e.cached_result(TileId(1)).unwrap();
        assert_eq!(cached.computed_at, 1);
        assert_eq!(cached.buffer.pixel(0, 0), [155, 155, 155, 255]);
    }

    #[test]
    fn test_load_with_no_processors_is_noop() {
        let mut e = engine();
        let completed = Rc::new(RefCell::new(false));
        let flag = completed.clone();
        e.on_tile_loaded(
            TileId(1),
            &buf(100),
            ItemId(1),
            Some(Box::new(move || *flag.borrow_mut() = true)),
        );
        assert!(!e.has_pending());
        assert!(e.cached_result(TileId(1)).is_none());
    }

    #[test]
    fn test_stale_chain_aborts_without_cache_or_completion() {
        let mut e = engine();
        e.install(
            vec![FilterSpec::global(vec![proc(invert()), proc(invert())])],
            LoadMode::Sync,
        )
        .unwrap();

        let completed = Rc::new(RefCell::new(false));
        let flag = completed.clone();
        e.on_tile_loaded(
            TileId(1),
            &buf(100),
            ItemId(1),
            Some(Box::new(move || *flag.borrow_mut() = true)),
        );

        // Two further configuration changes before the continuation fires.
        e.install(vec![FilterSpec::global(vec![proc(invert())])], LoadMode::Sync)
            .unwrap();
        e.install(vec![], LoadMode::Sync).unwrap();
        assert_eq!(e.version(), 3);

        e.run_pending();
        assert!(!*completed.borrow(), "stale completion must not fire");
        assert!(e.cached_result(TileId(1)).is_none(), "no cache under wrong version");
        assert!(!e.has_pending());
    }

    #[test]
    fn test_synchronous_load_has_no_cancellation_point() {
        let mut e = engine();
        e.install(vec![FilterSpec::global(vec![proc(invert())])], LoadMode::Sync)
            .unwrap();
        e.on_tile_loaded(TileId(2), &buf(10), ItemId(1), None);
        // No pump needed: the chain ran back-to-back.
        assert!(!e.has_pending());
        assert_eq!(e.cached_result(TileId(2)).unwrap().buffer.pixel(0, 0), [245, 245, 245, 255]);
    }

    #[test]
    fn test_draw_blits_matching_cache_and_consumes_it() {
        let mut e = engine();
        e.install(vec![FilterSpec::global(vec![proc(invert())])], LoadMode::Sync)
            .unwrap();
        e.on_tile_loaded(TileId(1), &buf(100), ItemId(1), Some(Box::new(|| {})));
        e.run_pending();

        let mut region = RenderedRegion::new(buf(100));
        e.on_tile_drawing(TileId(1), &mut region, ItemId(1));
        assert_eq!(region.buffer.pixel(0, 0), [155, 155, 155, 255]);
        assert_eq!(region.filtered_at(), Some(1));
        assert!(region.pristine().is_some());
        assert!(e.cached_result(TileId(1)).is_none(), "cache consumed by draw");
    }

    #[test]
    fn test_draw_is_idempotent_at_same_version() {
        // A second draw at the same version must not recompute. Use a
        // counting processor to observe applications.
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counting(Arc<AtomicUsize>);
        impl TileProcessor for Counting {
            fn name(&self) -> &str {
                "counting"
            }
            fn apply(&self, _buf: &mut PixelBuffer) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let applications = Arc::new(AtomicUsize::new(0));
        let mut e = engine();
        e.install(
            vec![FilterSpec::global(vec![Arc::new(Counting(applications.clone()))])],
            LoadMode::Sync,
        )
        .unwrap();

        let mut region = RenderedRegion::new(buf(50));
        e.on_tile_drawing(TileId(1), &mut region, ItemId(1));
        assert_eq!(applications.load(Ordering::SeqCst), 1);
        e.on_tile_drawing(TileId(1), &mut region, ItemId(1));
        assert_eq!(applications.load(Ordering::SeqCst), 1, "second draw is a no-op");
    }

    #[test]
    fn test_draw_restores_pristine_when_filters_removed() {
        let mut e = engine();
        e.install(vec![FilterSpec::global(vec![proc(invert())])], LoadMode::Sync)
            .unwrap();

        let original = buf(123);
        let mut region = RenderedRegion::new(original.clone());
        e.on_tile_drawing(TileId(1), &mut region, ItemId(1));
        assert_ne!(region.buffer, original);

        // Remove all filters; the next draw restores byte-for-byte.
        e.install(vec![], LoadMode::Sync).unwrap();
        e.on_tile_drawing(TileId(1), &mut region, ItemId(1));
        assert_eq!(region.buffer, original);
        assert!(region.pristine().is_none());
        assert_eq!(region.filtered_at(), Some(2));
    }

    #[test]
    fn test_draw_refilters_from_pristine_on_version_change() {
        let mut e = engine();
        e.install(
            vec![FilterSpec::global(vec![proc(brightness(10).unwrap())])],
            LoadMode::Sync,
        )
        .unwrap();
        let mut region = RenderedRegion::new(buf(100));
        e.on_tile_drawing(TileId(1), &mut region, ItemId(1));
        assert_eq!(region.buffer.pixel(0, 0), [110, 110, 110, 255]);

        // Swap the filter: the new one must see pristine input, not the
        // already-brightened pixels.
        e.install(
            vec![FilterSpec::global(vec![proc(brightness(20).unwrap())])],
            LoadMode::Sync,
        )
        .unwrap();
        e.on_tile_drawing(TileId(1), &mut region, ItemId(1));
        assert_eq!(region.buffer.pixel(0, 0), [120, 120, 120, 255]);
    }

    #[test]
    fn test_draw_drops_stale_cache_and_recomputes() {
        let mut e = engine();
        e.install(vec![FilterSpec::global(vec![proc(invert())])], LoadMode::Sync)
            .unwrap();
        e.on_tile_loaded(TileId(1), &buf(100), ItemId(1), Some(Box::new(|| {})));
        e.run_pending();
        assert!(e.cached_result(TileId(1)).is_some());

        // Version moves on; the cached result is now stale.
        e.install(
            vec![FilterSpec::global(vec![proc(brightness(5).unwrap())])],
            LoadMode::Sync,
        )
        .unwrap();
        let mut region = RenderedRegion::new(buf(100));
        e.on_tile_drawing(TileId(1), &mut region, ItemId(1));
        assert_eq!(region.buffer.pixel(0, 0), [105, 105, 105, 255]);
        assert!(e.cached_result(TileId(1)).is_none(), "stale entry discarded");
    }
}
