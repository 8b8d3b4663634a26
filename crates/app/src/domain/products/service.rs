//! Products service.
//!
//! The ingestion pipeline: validate, build the entity, persist, invalidate the
//! affected cache scopes, and report every step to the event sink.

use std::{
    error::Error,
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span, warn};

use crate::{
    clock::Clock,
    domain::products::{
        cache::{CacheCoordinator, CacheScope, CacheStore, CachedViews, VIEW_CACHE_TTL},
        context::RequestContext,
        data::{NewProduct, ProductField},
        errors::{InfrastructureError, ProductsServiceError, ValidationError, ValidationErrors},
        events::{EventSink, MetricsRecorder, OperationId, PipelineEvent, PipelineStage},
        inventory::InventorySummary,
        records::{ProductRecord, ProductUuid},
        store::{ProductFilter, ProductStore, StoreError},
        transform::{to_entity, to_view},
        validation::{DAILY_CREATION_LIMIT, ValidationEngine},
        views::ProductView,
    },
};

/// Message given to valid batch items rolled back with a conflicting item.
pub(crate) const ROLLED_BACK_MESSAGE: &str =
    "Not created because another item in the batch conflicted.";

/// Tunables for [`ProductPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Upper bound on each store or cache call.
    pub operation_timeout: Duration,
    pub cache_ttl: Duration,
    pub daily_limit: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(5),
            cache_ttl: VIEW_CACHE_TTL,
            daily_limit: DAILY_CREATION_LIMIT,
        }
    }
}

/// A batch item that was not created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    /// Position of the item in the submitted batch.
    pub index: usize,
    pub request: NewProduct,
    pub errors: ValidationErrors,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub batch_id: OperationId,
    pub created_count: usize,
    pub failed_count: usize,
    pub created: Vec<ProductView>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    fn new(batch_id: OperationId, created: Vec<ProductView>, mut failed: Vec<BatchFailure>) -> Self {
        failed.sort_by_key(|failure| failure.index);

        Self {
            batch_id,
            created_count: created.len(),
            failed_count: failed.len(),
            created,
            failed,
        }
    }
}

#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// Validate and create a single product.
    async fn create_product(
        &self,
        request: NewProduct,
        cancel: CancellationToken,
    ) -> Result<ProductView, ProductsServiceError>;

    /// Validate every request and create the valid ones.
    ///
    /// Invalid items are reported in the outcome rather than failing the batch.
    async fn create_products(
        &self,
        requests: Vec<NewProduct>,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome, ProductsServiceError>;

    /// Views of every product in `scope`, served from the cache when possible.
    async fn list_products(
        &self,
        scope: CacheScope,
        cancel: CancellationToken,
    ) -> Result<CachedViews, ProductsServiceError>;

    /// Stock and value figures, read straight from the store.
    async fn inventory_summary(
        &self,
        cancel: CancellationToken,
    ) -> Result<InventorySummary, ProductsServiceError>;
}

/// A batch item that passed validation.
struct Accepted {
    index: usize,
    request: NewProduct,
    recorder: MetricsRecorder,
}

impl Accepted {
    fn fail(mut self, stage: Option<PipelineStage>, reason: &str) {
        if let Some(stage) = stage {
            self.recorder.advance_with(stage, Some(reason.to_string()));
        }

        self.recorder.fail(reason);
    }
}

/// Render an error and its sources as one line.
fn describe(error: &dyn Error) -> String {
    let mut description = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        description.push_str(": ");
        description.push_str(&cause.to_string());
        source = cause.source();
    }

    description
}

#[derive(Clone)]
pub struct ProductPipeline {
    store: Arc<dyn ProductStore>,
    cache: CacheCoordinator,
    validator: Arc<ValidationEngine>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    settings: PipelineSettings,
}

impl Debug for ProductPipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ProductPipeline")
            .field("cache", &self.cache)
            .field("validator", &self.validator)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ProductPipeline {
    /// # Errors
    ///
    /// Returns an error if the validation patterns fail to compile.
    pub fn new(
        store: Arc<dyn ProductStore>,
        cache: Arc<dyn CacheStore>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        settings: PipelineSettings,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            cache: CacheCoordinator::new(cache, store.clone(), settings.cache_ttl),
            store,
            validator: Arc::new(ValidationEngine::new(settings.daily_limit)?),
            events,
            clock,
            settings,
        })
    }

    fn request_context(&self, cancel: CancellationToken) -> RequestContext {
        RequestContext::new(self.clock.now(), cancel, self.settings.operation_timeout)
    }

    /// Validate `request`, leaving the recorder at `Validated` when accepted.
    ///
    /// `pending` is the number of products already accepted for the same
    /// write and still unpersisted.
    async fn screen(
        &self,
        request: &NewProduct,
        pending: usize,
        recorder: &mut MetricsRecorder,
        ctx: &RequestContext,
    ) -> Result<ValidationErrors, InfrastructureError> {
        recorder.advance(PipelineStage::Validating);

        let pending = u64::try_from(pending).unwrap_or(u64::MAX);
        let errors = self
            .validator
            .validate_alongside(request, ctx, self.store.as_ref(), pending)
            .await?;

        if errors.is_empty() {
            recorder.advance(PipelineStage::Validated);
        } else {
            recorder.advance_with(PipelineStage::Rejected, Some(errors.to_string()));
        }

        Ok(errors)
    }

    async fn create_one(
        &self,
        request: NewProduct,
        mut recorder: MetricsRecorder,
        ctx: RequestContext,
    ) -> Result<ProductView, ProductsServiceError> {
        let operation = recorder.operation();

        let errors = match self.screen(&request, 0, &mut recorder, &ctx).await {
            Ok(errors) => errors,
            Err(source) => {
                recorder.fail(describe(&source));
                return Err(ProductsServiceError::Infrastructure { operation, source });
            }
        };

        if !errors.is_empty() {
            recorder.fail(errors.to_string());
            return Err(ProductsServiceError::Rejected(errors));
        }

        let record = to_entity(&request).into_record(ProductUuid::new(), self.clock.now());

        recorder.advance(PipelineStage::Persisting);

        match ctx
            .guard(self.store.insert(&record, ctx.cancellation()))
            .await
        {
            Ok(_) => recorder.advance(PipelineStage::Persisted),
            Err(StoreError::UniqueViolation { field, .. }) => {
                let errors = ValidationErrors::from(ValidationError::already_exists(field));
                let reason = errors.to_string();

                recorder.advance_with(PipelineStage::PersistFailed, Some(reason.clone()));
                recorder.fail(reason);

                return Err(ProductsServiceError::Rejected(errors));
            }
            Err(error) => {
                let source = InfrastructureError::from(error);
                let reason = describe(&source);

                recorder.advance_with(PipelineStage::PersistFailed, Some(reason.clone()));
                recorder.fail(reason);

                return Err(ProductsServiceError::Infrastructure { operation, source });
            }
        }

        let scopes = CacheScope::affected_by([record.category]);

        if let Err(error) = self.cache.invalidate(&scopes, &ctx).await {
            let source = InfrastructureError::from(error);
            recorder.fail(describe(&source));

            return Err(ProductsServiceError::Infrastructure { operation, source });
        }

        recorder.advance(PipelineStage::CacheInvalidated);
        recorder.succeed();

        Ok(to_view(&record, self.clock.now()))
    }

    /// Persist accepted items. Returns the items that were written alongside
    /// their records, plus the items refused by a uniqueness constraint.
    async fn persist_batch(
        &self,
        batch: OperationId,
        accepted: Vec<Accepted>,
        ctx: &RequestContext,
    ) -> Result<(Vec<(Accepted, ProductRecord)>, Vec<BatchFailure>), ProductsServiceError> {
        let now = self.clock.now();

        let mut pending: Vec<(Accepted, ProductRecord)> = accepted
            .into_iter()
            .map(|mut item| {
                let record = to_entity(&item.request).into_record(ProductUuid::new(), now);
                item.recorder.advance(PipelineStage::Persisting);
                (item, record)
            })
            .collect();

        if pending.is_empty() {
            return Ok((pending, Vec::new()));
        }

        if self.store.supports_transactions() {
            let records: Vec<ProductRecord> =
                pending.iter().map(|(_, record)| record.clone()).collect();

            return match ctx
                .guard(self.store.insert_many(&records, ctx.cancellation()))
                .await
            {
                Ok(_) => {
                    for (item, _) in &mut pending {
                        item.recorder.advance(PipelineStage::Persisted);
                    }

                    Ok((pending, Vec::new()))
                }
                Err(StoreError::UniqueViolation { field, index }) => {
                    let failures = pending
                        .into_iter()
                        .enumerate()
                        .map(|(position, (item, _))| {
                            let error = if index.is_none_or(|index| index == position) {
                                ValidationError::already_exists(field)
                            } else {
                                ValidationError::conflict(ProductField::Product, ROLLED_BACK_MESSAGE)
                            };

                            let errors = ValidationErrors::from(error);
                            let failure = BatchFailure {
                                index: item.index,
                                request: item.request.clone(),
                                errors: errors.clone(),
                            };

                            item.fail(Some(PipelineStage::PersistFailed), &errors.to_string());

                            failure
                        })
                        .collect();

                    Ok((Vec::new(), failures))
                }
                Err(error) => {
                    let source = InfrastructureError::from(error);
                    let reason = describe(&source);

                    for (item, _) in pending {
                        item.fail(Some(PipelineStage::PersistFailed), &reason);
                    }

                    Err(ProductsServiceError::Infrastructure {
                        operation: batch,
                        source,
                    })
                }
            };
        }

        let mut persisted = Vec::with_capacity(pending.len());
        let mut failures = Vec::new();
        let mut remaining = pending.into_iter();

        while let Some((mut item, record)) = remaining.next() {
            match ctx
                .guard(self.store.insert(&record, ctx.cancellation()))
                .await
            {
                Ok(_) => {
                    item.recorder.advance(PipelineStage::Persisted);
                    persisted.push((item, record));
                }
                Err(StoreError::UniqueViolation { field, .. }) => {
                    let errors = ValidationErrors::from(ValidationError::already_exists(field));

                    failures.push(BatchFailure {
                        index: item.index,
                        request: item.request.clone(),
                        errors: errors.clone(),
                    });

                    item.fail(Some(PipelineStage::PersistFailed), &errors.to_string());
                }
                Err(error) => {
                    let source = InfrastructureError::from(error);
                    let reason = describe(&source);

                    item.fail(Some(PipelineStage::PersistFailed), &reason);

                    for (rest, _) in remaining {
                        rest.fail(Some(PipelineStage::PersistFailed), &reason);
                    }

                    // Earlier items are committed; keep readers from serving a stale scope.
                    let scopes =
                        CacheScope::affected_by(persisted.iter().map(|(_, record)| record.category));

                    if let Err(error) = self.cache.invalidate(&scopes, ctx).await {
                        warn!(batch_id = %batch, "failed to invalidate views after partial batch: {error}");
                    }

                    for (done, _) in persisted {
                        done.fail(None, &reason);
                    }

                    return Err(ProductsServiceError::Infrastructure {
                        operation: batch,
                        source,
                    });
                }
            }
        }

        Ok((persisted, failures))
    }
}

#[async_trait]
impl ProductsService for ProductPipeline {
    async fn create_product(
        &self,
        request: NewProduct,
        cancel: CancellationToken,
    ) -> Result<ProductView, ProductsServiceError> {
        let ctx = self.request_context(cancel);
        let recorder = MetricsRecorder::start(self.events.clone(), &request);

        let span = info_span!(
            "create_product",
            operation_id = %recorder.operation(),
            sku = %request.sku,
        );

        self.create_one(request, recorder, ctx).instrument(span).await
    }

    async fn create_products(
        &self,
        requests: Vec<NewProduct>,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome, ProductsServiceError> {
        let batch = OperationId::new();
        let ctx = self.request_context(cancel);
        let span = info_span!("create_products", batch_id = %batch, size = requests.len());

        async move {
            self.events.record(&PipelineEvent::BatchReceived {
                batch,
                size: requests.len(),
            });

            let mut accepted = Vec::new();
            let mut failed = Vec::new();

            for (index, request) in requests.into_iter().enumerate() {
                let mut recorder = MetricsRecorder::start(self.events.clone(), &request);

                let errors = match self
                    .screen(&request, accepted.len(), &mut recorder, &ctx)
                    .await
                {
                    Ok(errors) => errors,
                    Err(source) => {
                        let reason = describe(&source);

                        recorder.fail(reason.clone());

                        for item in accepted {
                            Accepted::fail(item, None, &reason);
                        }

                        return Err(ProductsServiceError::Infrastructure {
                            operation: batch,
                            source,
                        });
                    }
                };

                if errors.is_empty() {
                    accepted.push(Accepted {
                        index,
                        request,
                        recorder,
                    });
                } else {
                    recorder.fail(errors.to_string());
                    failed.push(BatchFailure {
                        index,
                        request,
                        errors,
                    });
                }
            }

            let (persisted, refused) = self.persist_batch(batch, accepted, &ctx).await?;

            failed.extend(refused);

            let scopes =
                CacheScope::affected_by(persisted.iter().map(|(_, record)| record.category));

            if !persisted.is_empty()
                && let Err(error) = self.cache.invalidate(&scopes, &ctx).await
            {
                let source = InfrastructureError::from(error);
                let reason = describe(&source);

                for (item, _) in persisted {
                    item.fail(None, &reason);
                }

                return Err(ProductsServiceError::Infrastructure {
                    operation: batch,
                    source,
                });
            }

            let now = self.clock.now();
            let mut created = Vec::with_capacity(persisted.len());

            for (mut item, record) in persisted {
                item.recorder.advance(PipelineStage::CacheInvalidated);
                item.recorder.succeed();
                created.push(to_view(&record, now));
            }

            let outcome = BatchOutcome::new(batch, created, failed);

            self.events.record(&PipelineEvent::BatchCompleted {
                batch,
                created: outcome.created_count,
                failed: outcome.failed_count,
            });

            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn list_products(
        &self,
        scope: CacheScope,
        cancel: CancellationToken,
    ) -> Result<CachedViews, ProductsServiceError> {
        let operation = OperationId::new();
        let ctx = self.request_context(cancel);
        let span = info_span!("list_products", operation_id = %operation, scope = %scope);

        self.cache
            .get_or_populate(scope, &ctx)
            .instrument(span)
            .await
            .map_err(|source| ProductsServiceError::Infrastructure { operation, source })
    }

    async fn inventory_summary(
        &self,
        cancel: CancellationToken,
    ) -> Result<InventorySummary, ProductsServiceError> {
        let operation = OperationId::new();
        let ctx = self.request_context(cancel);

        let products = ctx
            .guard(self.store.query(&ProductFilter::All, ctx.cancellation()))
            .instrument(info_span!("inventory_summary", operation_id = %operation))
            .await
            .map_err(|error| ProductsServiceError::Infrastructure {
                operation,
                source: error.into(),
            })?;

        Ok(InventorySummary::from_records(&products, ctx.today()))
    }
}
