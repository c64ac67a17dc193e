//! The takeoff session: one versioned record of everything the user sees.
//!
//! All state changes go through the methods here. Each successful change
//! bumps [`Session::version`], so a front end can redraw only when needed.
//! Execution is single-threaded: the only suspending steps are the backend
//! calls, guarded by the busy flag.

use std::sync::{Arc, Weak};
use std::time::Duration;

use image::DynamicImage;
use thiserror::Error;

use crate::aggregate::{AggregateResults, ExtractionResult, ResultAggregator};
use crate::calibration::{
    Axis, CalibrationEngine, CalibrationError, CalibrationPhase, CalibrationState, ScaleFactor,
    ScalePreset,
};
use crate::client::{ClientError, DrawingBackend};
use crate::selection::{
    RegionRequest, Selection, SelectionError, SelectionHistory, SelectionId, SelectionState,
    SelectionStateMachine,
};
use crate::transform::{ImagePixel, PageUnit, Point};

/// Resolution multiplier used when rasterizing pages.
pub const DEFAULT_RENDER_ZOOM: f64 = 2.0;

/// How long a page may take to become displayable.
pub const DEFAULT_PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Display scale step for zoom in/out.
pub const DISPLAY_SCALE_STEP: f64 = 0.25;
pub const MIN_DISPLAY_SCALE: f64 = 0.25;
pub const MAX_DISPLAY_SCALE: f64 = 3.0;

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("Another request is still in progress")]
    Busy,
    #[error("No document loaded")]
    NoDocument,
    #[error("Already on the first page")]
    FirstPage,
    #[error("Unknown selection {0}")]
    UnknownSelection(SelectionId),
    #[error("Page did not load within {0:?}")]
    PageLoadTimeout(Duration),
    #[error("Page image could not be decoded: {0}")]
    ImageDecode(String),
    #[error(transparent)]
    Backend(#[from] ClientError),
}

/// How an error should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input; nothing changed, retry at will
    Input,
    /// A request is already outstanding
    Busy,
    /// The backend could not be reached
    Network,
    /// The page did not load in time
    Timeout,
    /// The backend ran but reported a failure
    Processing,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Calibration(_)
            | SessionError::Selection(_)
            | SessionError::NoDocument
            | SessionError::FirstPage
            | SessionError::UnknownSelection(_) => ErrorKind::Input,
            SessionError::Busy => ErrorKind::Busy,
            SessionError::PageLoadTimeout(_) => ErrorKind::Timeout,
            SessionError::Backend(ClientError::Network(_)) => ErrorKind::Network,
            SessionError::Backend(_) | SessionError::ImageDecode(_) => ErrorKind::Processing,
        }
    }
}

/// What pointer events currently drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Select,
    Calibrate,
}

/// Session tunables.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub render_zoom: f64,
    pub page_load_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            render_zoom: DEFAULT_RENDER_ZOOM,
            page_load_timeout: DEFAULT_PAGE_LOAD_TIMEOUT,
        }
    }
}

impl SessionConfig {
    pub fn with_render_zoom(mut self, zoom: f64) -> Self {
        self.render_zoom = zoom;
        self
    }

    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }
}

/// A rendered page.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_index: usize,
    pub zoom: f64,
    pub image: DynamicImage,
}

impl PageImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Keeps the session busy until dropped.
#[derive(Debug)]
struct BusyLease {
    _held: Arc<()>,
}

/// An extraction that has been sent to the backend and not yet resolved.
///
/// The session stays busy while the ticket is alive. Dropping it without
/// calling [`Session::complete_extraction`] abandons the request.
#[derive(Debug)]
pub struct ExtractionTicket {
    request: RegionRequest,
    page_index: usize,
    lease: BusyLease,
}

impl ExtractionTicket {
    pub fn request(&self) -> &RegionRequest {
        &self.request
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }
}

/// Application state for one document.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    document: Option<Vec<u8>>,
    page_index: usize,
    page: Option<PageImage>,
    display_scale: f64,
    mode: InteractionMode,
    calibration: CalibrationEngine,
    selection: SelectionStateMachine,
    history: SelectionHistory,
    aggregator: ResultAggregator,
    busy: Weak<()>,
    version: u64,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            document: None,
            page_index: 0,
            page: None,
            display_scale: 1.0,
            mode: InteractionMode::default(),
            calibration: CalibrationEngine::new(),
            selection: SelectionStateMachine::new(),
            history: SelectionHistory::new(),
            aggregator: ResultAggregator::new(),
            busy: Weak::new(),
            version: 0,
        }
    }

    /// Start with a previously saved calibration.
    pub fn with_calibration(mut self, calibration: CalibrationEngine) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_busy(&self) -> bool {
        self.busy.strong_count() > 0
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page(&self) -> Option<&PageImage> {
        self.page.as_ref()
    }

    pub fn display_scale(&self) -> f64 {
        self.display_scale
    }

    pub fn calibration(&self) -> &CalibrationState {
        self.calibration.state()
    }

    pub fn calibration_phase(&self) -> CalibrationPhase {
        self.calibration.phase()
    }

    pub fn calibration_points(&self) -> &[Point<ImagePixel>] {
        self.calibration.pending_points()
    }

    pub fn selection_state(&self) -> &SelectionState {
        self.selection.state()
    }

    pub fn history(&self) -> &SelectionHistory {
        &self.history
    }

    pub fn results(&self) -> &AggregateResults {
        self.aggregator.results()
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn acquire_busy(&mut self) -> BusyLease {
        let lease = Arc::new(());
        self.busy = Arc::downgrade(&lease);
        self.touch();
        BusyLease { _held: lease }
    }

    /// Replace the document. Totals and calibration carry over.
    ///
    /// Refused while a request is outstanding, so a late answer can never
    /// land in the new document's history.
    pub fn open_document(&mut self, document: Vec<u8>) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        tracing::info!("Opened document ({} bytes)", document.len());
        self.document = Some(document);
        self.page_index = 0;
        self.page = None;
        self.selection.cancel();
        self.calibration.reset_points();
        self.touch();
        Ok(())
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    /// Switch what pointer events do. Entering calibration starts a fresh
    /// pair of points.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        if mode == InteractionMode::Calibrate {
            self.calibration.reset_points();
        }
        self.mode = mode;
        self.touch();
    }

    /// Pointer pressed at an Image-Pixel position.
    pub fn pointer_down(&mut self, point: Point<ImagePixel>) {
        match self.mode {
            InteractionMode::Select => self.selection.pointer_down(point),
            InteractionMode::Calibrate => {
                self.calibration.add_point(point);
            }
        }
        self.touch();
    }

    pub fn pointer_move(&mut self, point: Point<ImagePixel>) {
        if self.mode == InteractionMode::Select {
            self.selection.pointer_move(point);
            self.touch();
        }
    }

    pub fn pointer_up(&mut self) {
        if self.mode == InteractionMode::Select && self.selection.pointer_up().is_some() {
            self.touch();
        }
    }

    /// Resolve the two calibration points with the entered real distance.
    /// Returns to selection mode on success.
    pub fn submit_calibration_distance(&mut self, input: &str) -> Result<ScaleFactor, SessionError> {
        let factor = self
            .calibration
            .apply_distance(input, self.config.render_zoom)?;
        self.mode = InteractionMode::Select;
        self.touch();
        Ok(factor)
    }

    pub fn reset_calibration_points(&mut self) {
        self.calibration.reset_points();
        self.touch();
    }

    pub fn apply_manual_scale(&mut self, input: &str, axis: Axis) -> Result<ScaleFactor, SessionError> {
        let factor = self.calibration.apply_manual(input, axis)?;
        self.touch();
        Ok(factor)
    }

    pub fn apply_preset(&mut self, index: usize) -> Result<&'static ScalePreset, SessionError> {
        let preset = self.calibration.apply_preset(index)?;
        self.touch();
        Ok(preset)
    }

    pub fn set_unit_label(&mut self, unit_label: &str) -> PageUnit {
        let suggested = self.calibration.set_unit_label(unit_label);
        self.touch();
        suggested
    }

    pub fn set_page_unit(&mut self, page_unit: PageUnit) {
        self.calibration.set_page_unit(page_unit);
        self.touch();
    }

    pub fn set_separate_axes(&mut self, separate: bool) {
        self.calibration.set_separate_axes(separate);
        self.touch();
    }

    pub fn set_precision_digits(&mut self, digits: u8) -> Result<(), SessionError> {
        self.calibration.set_precision_digits(digits)?;
        self.touch();
        Ok(())
    }

    /// Real distance between two Image-Pixel points, if calibrated.
    pub fn measure(&self, a: Point<ImagePixel>, b: Point<ImagePixel>) -> Option<f64> {
        let zoom = self.config.render_zoom;
        self.calibration
            .state()
            .measure(&a.to_document(zoom), &b.to_document(zoom))
    }

    /// Validate the pending rectangle and mark the session busy.
    ///
    /// The returned ticket must be handed back to
    /// [`Session::complete_extraction`] once the backend answers.
    pub fn begin_extraction(&mut self) -> Result<ExtractionTicket, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if self.document.is_none() {
            return Err(SessionError::NoDocument);
        }
        let request = self.selection.request(self.config.render_zoom)?;

        let lease = self.acquire_busy();
        tracing::info!(
            "Extracting {} on page {}",
            request.bounds_document,
            self.page_index
        );
        Ok(ExtractionTicket {
            request,
            page_index: self.page_index,
            lease,
        })
    }

    /// Apply the backend's answer for `ticket`.
    ///
    /// On success the region is recorded, merged into the totals, and the
    /// selection returns to idle. On failure the pending rectangle stays so
    /// the same request can be issued again.
    pub fn complete_extraction(
        &mut self,
        ticket: ExtractionTicket,
        outcome: Result<ExtractionResult, ClientError>,
    ) -> Result<SelectionId, SessionError> {
        let ExtractionTicket {
            request,
            page_index,
            lease,
        } = ticket;
        drop(lease);
        self.touch();

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Extraction failed: {}", e);
                return Err(e.into());
            }
        };

        if self.selection.pending() == Some(request.bounds_image_pixel) {
            self.selection.complete();
        }

        self.aggregator.record(&result);
        let id = self
            .history
            .record(
                page_index,
                request.bounds_image_pixel,
                request.bounds_document,
                result,
            )
            .id();
        tracing::info!("Recorded selection {}", id);
        Ok(id)
    }

    /// Send the pending rectangle to the backend and record the result.
    pub async fn extract_pending<B: DrawingBackend>(
        &mut self,
        backend: &B,
    ) -> Result<SelectionId, SessionError> {
        let ticket = self.begin_extraction()?;
        let outcome = {
            let document = self.document.as_deref().unwrap_or_default();
            backend
                .extract_region(document, &ticket.request.bounds_document, ticket.page_index)
                .await
        };
        self.complete_extraction(ticket, outcome)
    }

    /// Render and decode a page, giving up after the page-load timeout.
    ///
    /// On any failure the busy flag is released and the previous page stays.
    pub async fn load_page<B: DrawingBackend>(
        &mut self,
        backend: &B,
        page_index: usize,
    ) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if self.document.is_none() {
            return Err(SessionError::NoDocument);
        }

        let lease = self.acquire_busy();
        let zoom = self.config.render_zoom;
        let timeout = self.config.page_load_timeout;
        let outcome = {
            let document = self.document.as_deref().unwrap_or_default();
            tokio::time::timeout(
                timeout,
                render_and_decode(backend, document, page_index, zoom),
            )
            .await
        };
        drop(lease);
        self.touch();

        let page = match outcome {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                tracing::warn!("Failed to load page {}: {}", page_index, e);
                return Err(e);
            }
            Err(_elapsed) => {
                tracing::warn!("Page {} load timed out after {:?}", page_index, timeout);
                return Err(SessionError::PageLoadTimeout(timeout));
            }
        };

        tracing::info!(
            "Loaded page {} ({}x{})",
            page_index,
            page.width(),
            page.height()
        );
        self.page = Some(page);
        self.page_index = page_index;
        self.selection.cancel();
        self.calibration.reset_points();
        Ok(())
    }

    pub async fn next_page<B: DrawingBackend>(&mut self, backend: &B) -> Result<(), SessionError> {
        let next = self.page_index + 1;
        self.load_page(backend, next).await
    }

    pub async fn previous_page<B: DrawingBackend>(&mut self, backend: &B) -> Result<(), SessionError> {
        let previous = self
            .page_index
            .checked_sub(1)
            .ok_or(SessionError::FirstPage)?;
        self.load_page(backend, previous).await
    }

    /// Remove one selection and retract its contribution from the totals.
    pub fn delete_selection(&mut self, id: SelectionId) -> Result<Selection, SessionError> {
        let removed = self
            .history
            .remove(id)
            .ok_or(SessionError::UnknownSelection(id))?;
        self.aggregator.rebuild(self.history.results());
        self.touch();
        tracing::info!("Deleted selection {}", id);
        Ok(removed)
    }

    /// Empty the history and reset the totals together.
    pub fn clear_all(&mut self) {
        self.history.clear();
        self.aggregator.reset();
        self.touch();
        tracing::info!("Cleared all selections");
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_display_scale(self.display_scale + DISPLAY_SCALE_STEP)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_display_scale(self.display_scale - DISPLAY_SCALE_STEP)
    }

    pub fn reset_zoom(&mut self) -> f64 {
        self.set_display_scale(1.0)
    }

    /// On-screen magnification only. Captured coordinates are unaffected.
    fn set_display_scale(&mut self, scale: f64) -> f64 {
        self.display_scale = scale.clamp(MIN_DISPLAY_SCALE, MAX_DISPLAY_SCALE);
        self.touch();
        self.display_scale
    }
}

async fn render_and_decode<B: DrawingBackend>(
    backend: &B,
    document: &[u8],
    page_index: usize,
    zoom: f64,
) -> Result<PageImage, SessionError> {
    let bytes = backend.render_page(document, page_index, zoom).await?;
    let image =
        image::load_from_memory(&bytes).map_err(|e| SessionError::ImageDecode(e.to_string()))?;
    Ok(PageImage {
        page_index,
        zoom,
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ProfileValue;
    use crate::calibration::CalibrationMode;
    use crate::transform::Rect;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// In-memory backend: serves a small PNG and queued extraction results.
    struct FakeBackend {
        png: Vec<u8>,
        render_delay: Duration,
        extract_delay: Duration,
        extractions: Mutex<VecDeque<Result<ExtractionResult, ClientError>>>,
        regions: Mutex<Vec<Rect<crate::transform::Document>>>,
    }

    impl FakeBackend {
        fn new() -> Self {
            let img = RgbImage::from_fn(8, 6, |_, _| Rgb([255u8, 255u8, 255u8]));
            let mut buffer = Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(img)
                .write_to(&mut buffer, ImageFormat::Png)
                .unwrap();
            Self {
                png: buffer.into_inner(),
                render_delay: Duration::ZERO,
                extract_delay: Duration::ZERO,
                extractions: Mutex::new(VecDeque::new()),
                regions: Mutex::new(Vec::new()),
            }
        }

        fn with_render_delay(mut self, delay: Duration) -> Self {
            self.render_delay = delay;
            self
        }

        fn with_extract_delay(mut self, delay: Duration) -> Self {
            self.extract_delay = delay;
            self
        }

        fn queue(&self, outcome: Result<ExtractionResult, ClientError>) {
            self.extractions.lock().unwrap().push_back(outcome);
        }
    }

    impl DrawingBackend for FakeBackend {
        async fn render_page(
            &self,
            _document: &[u8],
            page_index: usize,
            _zoom: f64,
        ) -> Result<Vec<u8>, ClientError> {
            if !self.render_delay.is_zero() {
                tokio::time::sleep(self.render_delay).await;
            }
            if page_index >= 3 {
                return Err(processing("Page number out of range"));
            }
            Ok(self.png.clone())
        }

        async fn extract_region(
            &self,
            _document: &[u8],
            region: &Rect<crate::transform::Document>,
            _page_index: usize,
        ) -> Result<ExtractionResult, ClientError> {
            self.regions.lock().unwrap().push(*region);
            if !self.extract_delay.is_zero() {
                tokio::time::sleep(self.extract_delay).await;
            }
            self.extractions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ExtractionResult::default()))
        }
    }

    fn processing(detail: &str) -> ClientError {
        ClientError::Processing {
            status: 500,
            detail: detail.to_string(),
        }
    }

    fn studs(elevation: &str, total: u64, values: &[f64]) -> ExtractionResult {
        let mut result = ExtractionResult {
            elevations: vec![elevation.to_string()],
            studs_label_count: values.len() as u64,
            studs_total: total,
            ..Default::default()
        };
        result.profiles.insert(
            "W12X19".to_string(),
            values.iter().map(|v| ProfileValue::Number(*v)).collect(),
        );
        result
    }

    fn session_with_document() -> Session {
        let mut session = Session::new(SessionConfig::default());
        session.open_document(b"%PDF-1.7".to_vec()).unwrap();
        session
    }

    fn drag(session: &mut Session, from: (f64, f64), to: (f64, f64)) {
        session.pointer_down(Point::new(from.0, from.1));
        session.pointer_move(Point::new(to.0, to.1));
        session.pointer_up();
    }

    #[tokio::test]
    async fn test_extract_records_and_merges() {
        let backend = FakeBackend::new();
        backend.queue(Ok(studs("12'-6\"", 30, &[18.0, 12.0])));
        backend.queue(Ok(studs("12'-6\"", 18, &[18.0])));

        let mut session = session_with_document();
        drag(&mut session, (100.0, 40.0), (300.0, 140.0));
        let first = session.extract_pending(&backend).await.unwrap();
        assert_eq!(session.selection_state(), &SelectionState::Idle);

        drag(&mut session, (0.0, 0.0), (20.0, 20.0));
        let second = session.extract_pending(&backend).await.unwrap();
        assert!(second > first);

        let results = session.results();
        assert_eq!(results.studs_total, 48);
        assert_eq!(results.studs_label_count, 3);
        assert_eq!(results.elevations.len(), 1);
        assert_eq!(results.profiles["W12X19"].len(), 3);
        assert_eq!(session.history().len(), 2);
        assert!(!session.is_busy());

        let regions = backend.regions.lock().unwrap();
        assert_eq!(regions[0], Rect::new(50.0, 20.0, 100.0, 50.0));
    }

    #[tokio::test]
    async fn test_display_scale_does_not_affect_region() {
        let backend = FakeBackend::new();
        let mut session = session_with_document();
        session.zoom_in();
        session.zoom_in();
        assert_eq!(session.display_scale(), 1.5);

        drag(&mut session, (100.0, 40.0), (300.0, 140.0));
        session.extract_pending(&backend).await.unwrap();
        let selection = session.history().iter().next().unwrap();
        assert_eq!(selection.bounds_document(), &Rect::new(50.0, 20.0, 100.0, 50.0));
    }

    #[tokio::test]
    async fn test_failed_extraction_keeps_pending() {
        let backend = FakeBackend::new();
        backend.queue(Err(processing("unreadable region")));
        backend.queue(Ok(studs("EL 100'", 12, &[12.0])));

        let mut session = session_with_document();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        let err = session.extract_pending(&backend).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Processing);
        assert!(!session.is_busy());
        assert!(session.history().is_empty());
        assert!(matches!(
            session.selection_state(),
            SelectionState::PendingExtraction(_)
        ));

        assert!(session.extract_pending(&backend).await.is_ok());
        assert_eq!(session.results().studs_total, 12);
    }

    #[tokio::test]
    async fn test_undersized_selection_rejected_locally() {
        let backend = FakeBackend::new();
        let mut session = session_with_document();
        drag(&mut session, (0.0, 0.0), (5.0, 50.0));
        let version = session.version();

        let err = session.extract_pending(&backend).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(backend.regions.lock().unwrap().is_empty());
        assert_eq!(session.version(), version);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_busy_blocks_second_extraction() {
        let mut session = session_with_document();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        let ticket = session.begin_extraction().unwrap();
        assert!(session.is_busy());
        assert!(matches!(session.begin_extraction(), Err(SessionError::Busy)));

        // Calibration clicks and mode switches remain allowed.
        session.set_mode(InteractionMode::Calibrate);
        session.pointer_down(Point::new(1.0, 1.0));
        assert_eq!(session.calibration_phase(), CalibrationPhase::AwaitingSecondPoint);

        let id = session
            .complete_extraction(ticket, Ok(ExtractionResult::default()))
            .unwrap();
        assert!(!session.is_busy());
        assert!(session.history().get(id).is_some());
    }

    #[test]
    fn test_new_drag_during_extraction_survives_completion() {
        let mut session = session_with_document();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        let ticket = session.begin_extraction().unwrap();
        drag(&mut session, (100.0, 100.0), (200.0, 200.0));

        session
            .complete_extraction(ticket, Ok(ExtractionResult::default()))
            .unwrap();
        let pending = match session.selection_state() {
            SelectionState::PendingExtraction(rect) => *rect,
            other => panic!("unexpected state {:?}", other),
        };
        assert_eq!(pending.x, 100.0);
    }

    #[test]
    fn test_extraction_requires_document() {
        let mut session = Session::new(SessionConfig::default());
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        assert!(matches!(
            session.begin_extraction(),
            Err(SessionError::NoDocument)
        ));
    }

    #[tokio::test]
    async fn test_delete_retracts_contribution() {
        let backend = FakeBackend::new();
        backend.queue(Ok(studs("A", 30, &[18.0, 12.0])));
        backend.queue(Ok(studs("B", 18, &[18.0])));

        let mut session = session_with_document();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        let first = session.extract_pending(&backend).await.unwrap();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        session.extract_pending(&backend).await.unwrap();

        session.delete_selection(first).unwrap();
        let results = session.results();
        assert_eq!(results.studs_total, 18);
        assert_eq!(results.studs_label_count, 1);
        assert!(!results.has_elevation("A"));
        assert_eq!(results.profiles["W12X19"], vec![ProfileValue::Number(18.0)]);

        assert!(matches!(
            session.delete_selection(first),
            Err(SessionError::UnknownSelection(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_all() {
        let backend = FakeBackend::new();
        backend.queue(Ok(studs("A", 30, &[18.0, 12.0])));
        let mut session = session_with_document();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        session.extract_pending(&backend).await.unwrap();

        session.clear_all();
        assert!(session.history().is_empty());
        assert_eq!(session.results(), &AggregateResults::default());
    }

    #[tokio::test]
    async fn test_load_page() {
        let backend = FakeBackend::new();
        let mut session = session_with_document();
        session.load_page(&backend, 0).await.unwrap();
        let page = session.page().unwrap();
        assert_eq!((page.width(), page.height()), (8, 6));

        session.next_page(&backend).await.unwrap();
        assert_eq!(session.page_index(), 1);
        session.previous_page(&backend).await.unwrap();
        assert_eq!(session.page_index(), 0);
        assert!(matches!(
            session.previous_page(&backend).await,
            Err(SessionError::FirstPage)
        ));
    }

    #[tokio::test]
    async fn test_load_page_out_of_range_keeps_current() {
        let backend = FakeBackend::new();
        let mut session = session_with_document();
        session.load_page(&backend, 2).await.unwrap();
        let err = session.next_page(&backend).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Processing);
        assert_eq!(session.page_index(), 2);
        assert!(session.page().is_some());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_load_page_timeout_releases_busy() {
        let backend = FakeBackend::new().with_render_delay(Duration::from_millis(500));
        let mut session = Session::new(
            SessionConfig::default().with_page_load_timeout(Duration::from_millis(20)),
        );
        session.open_document(b"%PDF-1.7".to_vec()).unwrap();

        let err = session.load_page(&backend, 0).await.unwrap_err();
        assert!(matches!(err, SessionError::PageLoadTimeout(_)));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!session.is_busy());
        assert!(session.page().is_none());
    }

    #[test]
    fn test_dropped_ticket_releases_busy() {
        let mut session = session_with_document();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        let ticket = session.begin_extraction().unwrap();
        assert!(session.is_busy());

        drop(ticket);
        assert!(!session.is_busy());
        assert!(session.begin_extraction().is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_page_load_releases_busy() {
        let backend = FakeBackend::new().with_render_delay(Duration::from_millis(500));
        let mut session = session_with_document();

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), session.load_page(&backend, 0)).await;
        assert!(cancelled.is_err());
        assert!(!session.is_busy());
        assert!(session.page().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_extraction_releases_busy() {
        let backend = FakeBackend::new().with_extract_delay(Duration::from_millis(500));
        let mut session = session_with_document();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), session.extract_pending(&backend)).await;
        assert!(cancelled.is_err());
        assert!(!session.is_busy());
        assert!(session.history().is_empty());
        assert!(matches!(
            session.selection_state(),
            SelectionState::PendingExtraction(_)
        ));
    }

    #[test]
    fn test_open_document_refused_while_busy() {
        let mut session = session_with_document();
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        let ticket = session.begin_extraction().unwrap();

        assert!(matches!(
            session.open_document(b"%PDF-B".to_vec()),
            Err(SessionError::Busy)
        ));
        let late = ExtractionResult {
            studs_total: 7,
            ..Default::default()
        };
        session.complete_extraction(ticket, Ok(late)).unwrap();
        assert_eq!(session.results().studs_total, 7);

        session.open_document(b"%PDF-B".to_vec()).unwrap();
        assert_eq!(session.page_index(), 0);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_two_point_calibration_through_session() {
        let mut session = session_with_document();
        session.set_mode(InteractionMode::Calibrate);
        session.pointer_down(Point::new(100.0, 100.0));
        session.pointer_down(Point::new(100.0, 300.0));
        assert_eq!(
            session.calibration_phase(),
            CalibrationPhase::AwaitingDistanceInput
        );

        assert!(session.submit_calibration_distance("ten").is_err());
        assert_eq!(session.mode(), InteractionMode::Calibrate);

        let factor = session.submit_calibration_distance("10").unwrap();
        assert_eq!(factor.x, 10.0);
        assert_eq!(session.mode(), InteractionMode::Select);
        assert_eq!(session.calibration().mode, CalibrationMode::TwoPoint);

        let real = session
            .measure(Point::new(0.0, 0.0), Point::new(0.0, 100.0))
            .unwrap();
        assert!((real - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_calibrate_mode_does_not_drag() {
        let mut session = session_with_document();
        session.set_mode(InteractionMode::Calibrate);
        drag(&mut session, (0.0, 0.0), (50.0, 50.0));
        assert_eq!(session.selection_state(), &SelectionState::Idle);
    }

    #[test]
    fn test_display_scale_clamped() {
        let mut session = Session::new(SessionConfig::default());
        for _ in 0..20 {
            session.zoom_in();
        }
        assert_eq!(session.display_scale(), MAX_DISPLAY_SCALE);
        for _ in 0..20 {
            session.zoom_out();
        }
        assert_eq!(session.display_scale(), MIN_DISPLAY_SCALE);
        assert_eq!(session.reset_zoom(), 1.0);
    }

    #[test]
    fn test_version_increases() {
        let mut session = Session::new(SessionConfig::default());
        let v0 = session.version();
        session.apply_preset(9).unwrap();
        assert!(session.version() > v0);
        let v1 = session.version();
        assert!(session.apply_manual_scale("-1", Axis::X).is_err());
        assert_eq!(session.version(), v1);
    }
}
