//! One publishing cycle: load → select → caption → publish → persist.
//!
//! Every failure is logged and folded into a [`CycleOutcome`]; nothing is
//! returned as an error, so a bad cycle never disturbs the scheduler.
//! Workbook parsing and cursor file I/O run on the blocking pool.

use std::sync::Arc;

use couponbot_core::caption::CaptionTemplate;
use couponbot_core::config::CouponConfig;
use couponbot_publisher::{GraphPublisher, PublishError, PublishReceipt, Publisher};
use couponbot_store::{CouponSource, CursorStore, SpreadsheetSource};
use tracing::{error, info, warn};

/// Result of a single cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The coupon at `index` is live and the cursor now points at it.
    Published {
        index: usize,
        receipt: PublishReceipt,
    },
    /// The table loaded but holds no coupons; nothing was sent.
    NoCoupons,
    /// The table could not be read; nothing was sent.
    SourceFailed,
    /// The platform rejected the post or could not be reached. The cursor
    /// is untouched so the same coupon is tried next cycle.
    PublishFailed { index: usize, error: PublishError },
    /// The post went out but the cursor could not be saved; the next cycle
    /// will publish the same coupon again.
    CursorWriteFailed { index: usize },
}

/// Owns the collaborators of a cycle. Built once at startup.
pub struct Poster {
    source: Arc<dyn CouponSource>,
    cursor: Arc<CursorStore>,
    publisher: Box<dyn Publisher>,
    template: CaptionTemplate,
}

impl Poster {
    pub fn new(
        source: Box<dyn CouponSource>,
        cursor: CursorStore,
        publisher: Box<dyn Publisher>,
        template: CaptionTemplate,
    ) -> Self {
        Self {
            source: Arc::from(source),
            cursor: Arc::new(cursor),
            publisher,
            template,
        }
    }

    /// Wire up the spreadsheet source, cursor file and Graph publisher.
    pub fn from_config(config: &CouponConfig) -> Result<Self, PublishError> {
        let publisher = GraphPublisher::new(&config.facebook)?;
        if !publisher.is_configured() {
            warn!("Facebook page id or access token not set; every publish will fail");
        }
        Ok(Self::new(
            Box::new(SpreadsheetSource::new(
                &config.source.path,
                config.source.sheet.clone(),
            )),
            CursorStore::new(&config.cursor.path),
            Box::new(publisher),
            CaptionTemplate::from(&config.caption),
        ))
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        let source = Arc::clone(&self.source);
        let coupons = match tokio::task::spawn_blocking(move || source.load()).await {
            Ok(Ok(coupons)) => coupons,
            Ok(Err(e)) => {
                error!(error = %e, "failed to load coupon table, skipping cycle");
                return CycleOutcome::SourceFailed;
            }
            Err(e) => {
                error!(error = %e, "coupon table load aborted, skipping cycle");
                return CycleOutcome::SourceFailed;
            }
        };
        if coupons.is_empty() {
            warn!("coupon table is empty, skipping cycle");
            return CycleOutcome::NoCoupons;
        }

        let total = coupons.len();
        let cursor = Arc::clone(&self.cursor);
        let index = match tokio::task::spawn_blocking(move || cursor.next_index(total)).await {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "cursor read aborted, starting from the first coupon");
                0
            }
        };
        let coupon = &coupons[index];
        info!(index, total, title = %coupon.title, "selected coupon");

        let caption = self.template.render(coupon);
        info!(index, publisher = self.publisher.name(), "posting coupon");

        match self.publisher.publish(&coupon.image, &caption).await {
            Ok(receipt) => {
                info!(
                    index,
                    number = index + 1,
                    post_id = receipt.post_id.as_deref().unwrap_or("-"),
                    "coupon published"
                );
                let cursor = Arc::clone(&self.cursor);
                match tokio::task::spawn_blocking(move || cursor.update(index)).await {
                    Ok(Ok(())) => CycleOutcome::Published { index, receipt },
                    Ok(Err(e)) => {
                        error!(index, error = %e, "coupon published but cursor not saved");
                        CycleOutcome::CursorWriteFailed { index }
                    }
                    Err(e) => {
                        error!(index, error = %e, "coupon published but cursor write aborted");
                        CycleOutcome::CursorWriteFailed { index }
                    }
                }
            }
            Err(e) => {
                if e.is_auth_failure() {
                    error!(index, error = %e, "publish rejected: check page id and access token");
                } else {
                    error!(index, error = %e, "publish failed, will retry next cycle");
                }
                CycleOutcome::PublishFailed { index, error: e }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use couponbot_core::Coupon;
    use couponbot_store::StoreError;
    use std::sync::{Arc, Mutex};

    struct VecSource(Vec<Coupon>);

    impl CouponSource for VecSource {
        fn load(&self) -> couponbot_store::Result<Vec<Coupon>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSource;

    impl CouponSource for BrokenSource {
        fn load(&self) -> couponbot_store::Result<Vec<Coupon>> {
            Err(StoreError::MissingHeader)
        }
    }

    struct PanickingSource;

    impl CouponSource for PanickingSource {
        fn load(&self) -> couponbot_store::Result<Vec<Coupon>> {
            panic!("workbook reader blew up");
        }
    }

    /// Records every call; fails with `status` when set.
    #[derive(Clone, Default)]
    struct FakePublisher {
        calls: Arc<Mutex<Vec<(String, String)>>>,
        fail_status: Arc<Mutex<Option<u16>>>,
    }

    impl FakePublisher {
        fn fail_with(&self, status: Option<u16>) {
            *self.fail_status.lock().unwrap() = status;
        }

        fn images(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(i, _)| i.clone()).collect()
        }
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        fn name(&self) -> &str {
            "fake"
        }

        async fn publish(
            &self,
            image_url: &str,
            caption: &str,
        ) -> Result<PublishReceipt, PublishError> {
            self.calls
                .lock()
                .unwrap()
                .push((image_url.to_string(), caption.to_string()));
            match *self.fail_status.lock().unwrap() {
                Some(status) => Err(PublishError::Api {
                    status,
                    code: None,
                    message: "rejected".into(),
                }),
                None => Ok(PublishReceipt {
                    id: Some("1".into()),
                    post_id: Some("page_1".into()),
                }),
            }
        }
    }

    fn coupon(n: usize) -> Coupon {
        Coupon {
            title: format!("Coupon {n}"),
            description: format!("Deal number {n}"),
            code: format!("CODE{n}"),
            countries: "SA".into(),
            note: "none".into(),
            link: format!("https://shop.example/{n}"),
            image: format!("https://cdn.example/{n}.jpg"),
        }
    }

    fn poster(
        source: Box<dyn CouponSource>,
        dir: &tempfile::TempDir,
    ) -> (Poster, FakePublisher) {
        let fake = FakePublisher::default();
        let poster = Poster::new(
            source,
            CursorStore::new(dir.path().join("state.json")),
            Box::new(fake.clone()),
            CaptionTemplate::default(),
        );
        (poster, fake)
    }

    #[tokio::test]
    async fn three_coupons_rotate_and_wrap() {
        let dir = tempfile::tempdir().unwrap();
        let (poster, fake) = poster(Box::new(VecSource((0..3).map(coupon).collect())), &dir);
        let cursor = CursorStore::new(dir.path().join("state.json"));

        for expected in [0usize, 1, 2, 0] {
            match poster.run_cycle().await {
                CycleOutcome::Published { index, .. } => assert_eq!(index, expected),
                other => panic!("expected Published, got {other:?}"),
            }
            assert_eq!(cursor.read_last_index().unwrap(), Some(expected as i64));
        }
        assert_eq!(
            fake.images(),
            vec![
                "https://cdn.example/0.jpg",
                "https://cdn.example/1.jpg",
                "https://cdn.example/2.jpg",
                "https://cdn.example/0.jpg",
            ]
        );
    }

    #[tokio::test]
    async fn caption_is_rendered_from_selected_coupon() {
        let dir = tempfile::tempdir().unwrap();
        let (poster, fake) = poster(Box::new(VecSource(vec![coupon(7)])), &dir);
        poster.run_cycle().await;

        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, CaptionTemplate::default().render(&coupon(7)));
    }

    #[tokio::test]
    async fn empty_table_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (poster, fake) = poster(Box::new(VecSource(Vec::new())), &dir);

        assert!(matches!(poster.run_cycle().await, CycleOutcome::NoCoupons));
        assert!(fake.images().is_empty());
        assert!(!dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn unreadable_table_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (poster, fake) = poster(Box::new(BrokenSource), &dir);

        assert!(matches!(poster.run_cycle().await, CycleOutcome::SourceFailed));
        assert!(fake.images().is_empty());
        assert!(!dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn panicking_source_fails_the_cycle_only() {
        let dir = tempfile::tempdir().unwrap();
        let (poster, fake) = poster(Box::new(PanickingSource), &dir);

        assert!(matches!(poster.run_cycle().await, CycleOutcome::SourceFailed));
        assert!(matches!(poster.run_cycle().await, CycleOutcome::SourceFailed));
        assert!(fake.images().is_empty());
        assert!(!dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn failed_publish_keeps_cursor_and_retries_same_coupon() {
        let dir = tempfile::tempdir().unwrap();
        let (poster, fake) = poster(Box::new(VecSource((0..3).map(coupon).collect())), &dir);
        let cursor = CursorStore::new(dir.path().join("state.json"));
        cursor.update(0).unwrap();

        fake.fail_with(Some(400));
        match poster.run_cycle().await {
            CycleOutcome::PublishFailed { index, error } => {
                assert_eq!(index, 1);
                assert!(matches!(error, PublishError::Api { status: 400, .. }));
            }
            other => panic!("expected PublishFailed, got {other:?}"),
        }
        assert_eq!(cursor.read_last_index().unwrap(), Some(0));

        fake.fail_with(None);
        assert!(matches!(
            poster.run_cycle().await,
            CycleOutcome::Published { index: 1, .. }
        ));
        assert_eq!(fake.images()[0], fake.images()[1]);
    }

    #[tokio::test]
    async fn malformed_cursor_restarts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("state.json"), "garbage").unwrap();
        let (poster, _fake) = poster(Box::new(VecSource((0..3).map(coupon).collect())), &dir);

        assert!(matches!(
            poster.run_cycle().await,
            CycleOutcome::Published { index: 0, .. }
        ));
    }

    #[tokio::test]
    async fn cursor_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let fake = FakePublisher::default();
        let poster = Poster::new(
            Box::new(VecSource(vec![coupon(0)])),
            CursorStore::new(blocker.join("state.json")),
            Box::new(fake.clone()),
            CaptionTemplate::default(),
        );

        assert!(matches!(
            poster.run_cycle().await,
            CycleOutcome::CursorWriteFailed { index: 0 }
        ));
        assert_eq!(fake.images().len(), 1);
    }
}
