//! The loader facade
//!
//! [`AssetLoader`] resolves a url, picks the adapter for its extension and
//! drives the load through the optional queue and cache. Everything that
//! fixes ordering (url resolution, dispatch, queue tickets) happens when a
//! load method is called; only the engine work happens when the returned
//! future is polled.

pub mod adapters;

use futures::future;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::metrics::AssetMetricsHandle;
use crate::cache::{AssetCache, CacheLookup};
use crate::config::LoaderConfig;
use crate::engine::Engine;
use crate::error::{LoadError, Result};
use crate::format::{is_material_library, AssetFormat};
use crate::join::{BatchResult, FanIn};
use crate::locator::{Locator, ResolvedFile};
use crate::model::LoadedAsset;
use crate::queue::{RequestQueue, Ticket};
use crate::runtime::{AsyncSpawner, BoxFuture, JoinHandle};
use crate::scene::{SceneContainer, SceneLoadReport, SceneRequest};
use adapters::MtlSource;

/// A load that has been resolved and dispatched but not yet run
struct LoadJob {
    file: ResolvedFile,
    format: AssetFormat,
    mtl: MtlSource,
    cache_key: String,
    ticket: Option<Ticket>,
}

struct Inner<E> {
    engine: E,
    config: LoaderConfig,
    locator: Locator,
    cache: AssetCache,
    queue: RequestQueue,
    metrics: AssetMetricsHandle,
}

impl<E: Engine> Inner<E> {
    async fn run(&self, job: LoadJob) -> Result<LoadedAsset> {
        let LoadJob {
            file,
            format,
            mtl,
            cache_key,
            ticket,
        } = job;

        // held until this load completes
        let _slot = match ticket {
            Some(ticket) => Some(ticket.acquire().await),
            None => None,
        };

        if !self.config.cache {
            return self.fetch(format, &file, &mtl).await;
        }

        loop {
            match self.cache.request(&cache_key) {
                CacheLookup::Ready(asset) => return Ok(asset),
                CacheLookup::Pending(pending) => match pending.wait().await {
                    Some(result) => return result,
                    // the loading request went away; take over its slot
                    None => log::debug!("Retrying abandoned load of {cache_key}"),
                },
                CacheLookup::Miss(fill) => {
                    let result = self.fetch(format, &file, &mtl).await;
                    fill.complete(&result);
                    return result;
                }
            }
        }
    }

    async fn fetch(
        &self,
        format: AssetFormat,
        file: &ResolvedFile,
        mtl: &MtlSource,
    ) -> Result<LoadedAsset> {
        let start_time = Instant::now();
        let result = adapters::load(&self.engine, &self.config, format, file, mtl).await;

        match &result {
            Ok(_) => self.metrics.record_load(&file.url, start_time.elapsed()),
            Err(_) => self.metrics.record_failure(),
        }
        result
    }
}

/// Loads assets of any supported format through an [`Engine`]
///
/// Cheap to clone; clones share the engine, cache, queue and metrics.
///
/// # Example
/// ```
/// use polyload::{AssetLoader, LoaderConfig, MockEngine, SceneNode};
///
/// let engine = MockEngine::new();
/// engine.insert_node("models/chair.fbx", SceneNode::new(None));
///
/// let loader = AssetLoader::new(engine, LoaderConfig::default());
/// let chair = futures::executor::block_on(loader.load_one("models/chair.fbx")).unwrap();
/// assert_eq!(chair.name(), Some("chair"));
/// ```
pub struct AssetLoader<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for AssetLoader<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Engine> std::fmt::Debug for AssetLoader<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("engine", &self.inner.engine.engine_name())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl<E: Engine + 'static> AssetLoader<E> {
    /// Create a loader over `engine`
    pub fn new(engine: E, config: LoaderConfig) -> Self {
        let metrics = AssetMetricsHandle::new();
        Self {
            inner: Arc::new(Inner {
                engine,
                locator: config.locator(),
                config,
                cache: AssetCache::with_metrics(metrics.clone()),
                queue: RequestQueue::new(),
                metrics,
            }),
        }
    }

    /// Get a reference to the engine
    pub fn engine(&self) -> &E {
        &self.inner.engine
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// The clone cache; only filled when [`LoaderConfig::cache`] is set
    pub fn cache(&self) -> &AssetCache {
        &self.inner.cache
    }

    /// The request queue; only used when [`LoaderConfig::use_queue`] is set
    pub fn queue(&self) -> &RequestQueue {
        &self.inner.queue
    }

    /// Get a reference to the metrics handle
    pub fn metrics(&self) -> &AssetMetricsHandle {
        &self.inner.metrics
    }

    /// Load one asset
    ///
    /// The url is resolved and, with the queue enabled, placed in line
    /// before this returns. Unrecognized extensions resolve to
    /// [`LoadError::UnsupportedFormat`].
    ///
    /// # Queue
    /// With [`LoaderConfig::use_queue`] the returned future holds its place
    /// from this call on. Loads behind it wait until it is polled to
    /// completion or dropped, so awaiting a later load before an earlier one
    /// on the same task never finishes:
    ///
    /// ```ignore
    /// let a = loader.load_one("a.obj");
    /// let b = loader.load_one("b.obj");
    /// b.await; // waits on `a`, which nothing polls
    /// ```
    ///
    /// Await them in call order, join them, or spawn them.
    pub fn load_one(&self, url: &str) -> impl Future<Output = Result<LoadedAsset>> + Send + 'static {
        self.start(url, None)
    }

    /// Load an OBJ with the materials of `mtl` instead of its companion MTL
    ///
    /// `mtl` is ignored for other formats.
    pub fn load_one_with_mtl(
        &self,
        url: &str,
        mtl: &str,
    ) -> impl Future<Output = Result<LoadedAsset>> + Send + 'static {
        self.start(url, Some(mtl))
    }

    /// Load several assets concurrently
    ///
    /// Resolves once, after every load finished, with the results in the
    /// order the urls were given. A failed load fills its slot with the
    /// error; the others are unaffected. With the queue enabled the batch
    /// takes its places at this call, as described on
    /// [`load_one`](Self::load_one).
    pub fn load_many<I, S>(&self, urls: I) -> impl Future<Output = BatchResult> + Send + 'static
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let loads = urls
            .into_iter()
            .map(|url| self.start(url.as_ref(), None))
            .collect();
        join_ordered(loads)
    }

    /// Like [`load_many`](Self::load_many), with every OBJ using `mtl`
    pub fn load_many_sharing_mtl<I, S>(
        &self,
        urls: I,
        mtl: &str,
    ) -> impl Future<Output = BatchResult> + Send + 'static
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let loads = urls
            .into_iter()
            .map(|url| self.start(url.as_ref(), Some(mtl)))
            .collect();
        join_ordered(loads)
    }

    /// Load every asset of `request` and add it to `scene` under its name
    ///
    /// Assets are added in name order once all loads finished, with their
    /// position, rotation and scale overrides applied. An asset whose
    /// overrides do not parse is reported and never loaded.
    pub async fn load_into_scene<C>(&self, scene: &mut C, request: &SceneRequest) -> SceneLoadReport
    where
        C: SceneContainer + ?Sized,
    {
        let mut report = SceneLoadReport::default();
        let mut placed = Vec::with_capacity(request.len());
        let mut loads = Vec::with_capacity(request.len());

        for (name, entry) in &request.assets {
            let overrides = match entry.overrides() {
                Ok(overrides) => overrides,
                Err(e) => {
                    let err = LoadError::Transform {
                        name: name.clone(),
                        reason: e.to_string(),
                    };
                    log::warn!("{err}");
                    report.failed.push((name.clone(), err));
                    continue;
                }
            };

            let mtl = entry.mtl.as_deref().or(request.shared_mtl.as_deref());
            placed.push((name.clone(), overrides));
            loads.push(self.start(&entry.url, mtl));
        }

        let batch = join_ordered(loads).await;

        for ((name, overrides), result) in placed.into_iter().zip(batch) {
            match result {
                Ok(mut asset) => {
                    match asset.transform_mut() {
                        Some(transform) => overrides.apply(transform),
                        None if !overrides.is_empty() => {
                            log::warn!("{name} is a bare texture, ignoring its transform")
                        }
                        None => {}
                    }
                    scene.add(&name, asset);
                    report.inserted.push(name);
                }
                Err(err) => report.failed.push((name, err)),
            }
        }

        report
    }

    /// Load one asset on `spawner` and hand the result to `callback`
    pub fn load_with<S, F>(&self, spawner: &S, url: &str, callback: F) -> JoinHandle
    where
        S: AsyncSpawner,
        F: FnOnce(Result<LoadedAsset>) + Send + 'static,
    {
        let load = self.load_one(url);
        spawner.spawn(async move { callback(load.await) })
    }

    /// Load several assets on `spawner` and hand the ordered results to
    /// `callback` once all finished
    pub fn load_many_with<I, T, S, F>(&self, spawner: &S, urls: I, callback: F) -> JoinHandle
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
        S: AsyncSpawner,
        F: FnOnce(BatchResult) + Send + 'static,
    {
        let batch = self.load_many(urls);
        spawner.spawn(async move { callback(batch.await) })
    }

    fn start(&self, url: &str, mtl: Option<&str>) -> BoxFuture<'static, Result<LoadedAsset>> {
        match self.prepare(url, mtl) {
            Ok(job) => {
                let inner = Arc::clone(&self.inner);
                Box::pin(async move { inner.run(job).await })
            }
            Err(err) => {
                log::warn!("{err}");
                Box::pin(future::ready(Err(err)))
            }
        }
    }

    fn prepare(&self, url: &str, mtl: Option<&str>) -> Result<LoadJob> {
        let inner = &self.inner;
        let file = inner.locator.resolve(url)?;

        let Some(format) = AssetFormat::from_extension(&file.extension) else {
            if is_material_library(&file.extension) {
                log::debug!("{} is a material library and only loads with an OBJ", file.file_name);
            }
            return Err(LoadError::UnsupportedFormat {
                name: file.file_name,
                extension: file.extension,
            });
        };

        let mtl = match mtl {
            Some(mtl) if format == AssetFormat::Obj => MtlSource::Explicit(inner.locator.resolve(mtl)?),
            _ => MtlSource::Companion,
        };
        let cache_key = match &mtl {
            MtlSource::Explicit(mtl) => format!("{}#mtl={}", file.url, mtl.url),
            MtlSource::Companion => file.url.clone(),
        };

        let ticket = inner.config.use_queue.then(|| inner.queue.enqueue());
        log::debug!("Dispatching {} to the {format} adapter", file.url);

        Ok(LoadJob {
            file,
            format,
            mtl,
            cache_key,
            ticket,
        })
    }
}

/// Drive `loads` concurrently and collect their results in input order
fn join_ordered(
    loads: Vec<BoxFuture<'static, Result<LoadedAsset>>>,
) -> impl Future<Output = BatchResult> + Send + 'static {
    async move {
        let mut join = FanIn::new(loads.len());
        let mut pending: FuturesUnordered<_> = loads
            .into_iter()
            .enumerate()
            .map(|(index, load)| async move { (index, load.await) })
            .collect();

        while let Some((index, result)) = pending.next().await {
            if join.complete(index, result) {
                break;
            }
        }
        BatchResult::new(join.into_results().unwrap_or_default())
    }
}
