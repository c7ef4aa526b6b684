//! Configuration for rendering, profiling and conversion.

use std::fmt;
use std::sync::Arc;

use rayon::ThreadPool;

use crate::color::IccProfile;
use crate::fonts::OpenTypeFont;
use crate::model::Locale;
use crate::profile::{OutputProfile, PageRasterizer, StandardProfile, Strategy};

/// Options applied when a document is written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderConfig {
    /// Overrides the document's own compression setting.
    pub compress: Option<bool>,

    /// Indent the XMP packet.
    pub pretty_xmp: bool,

    /// Producer recorded in the Info entries, if the document has none.
    pub producer: Option<String>,
}

impl RenderConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force compression on or off.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    /// Indent the XMP packet.
    pub fn with_pretty_xmp(mut self, pretty: bool) -> Self {
        self.pretty_xmp = pretty;
        self
    }

    /// Set the producer.
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }
}

/// How an [`OutputProfiler`](crate::profile::OutputProfiler) repairs a
/// document.
#[derive(Clone)]
pub struct ProfilerConfig {
    /// Which kinds of repair are allowed.
    pub strategy: Strategy,

    /// Language set on documents that declare none.
    pub default_language: Option<Locale>,

    /// Title set on documents that have none. "Untitled" if unset.
    pub default_title: Option<String>,

    /// Resolution of rasterized pages.
    pub raster_dpi: f32,

    /// Pool rasterization runs on. Pages are rasterized sequentially
    /// when unset.
    pub raster_pool: Option<Arc<ThreadPool>>,

    /// Rasterizer, the built-in vector rasterizer when unset.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Fonts that may replace unembedded fonts.
    pub font_pool: Vec<Arc<OpenTypeFont>>,

    /// Profiles colors may be anchored to, besides the output intent.
    pub icc_pool: Vec<Arc<IccProfile>>,
}

impl fmt::Debug for ProfilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfilerConfig")
            .field("strategy", &self.strategy)
            .field("default_language", &self.default_language)
            .field("default_title", &self.default_title)
            .field("raster_dpi", &self.raster_dpi)
            .field("raster_pool", &self.raster_pool.as_ref().map(|p| p.current_num_threads()))
            .field("rasterizer", &self.rasterizer.is_some())
            .field("font_pool", &self.font_pool.len())
            .field("icc_pool", &self.icc_pool.len())
            .finish()
    }
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfilerConfig {
    /// Create new configuration: fix everything, 150 dpi rasters.
    pub fn new() -> Self {
        Self {
            strategy: Strategy::JUST_FIX_IT,
            default_language: None,
            default_title: None,
            raster_dpi: 150.0,
            raster_pool: None,
            rasterizer: None,
            font_pool: Vec::new(),
            icc_pool: Vec::new(),
        }
    }

    /// Set the repair strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the language used when a document declares none.
    pub fn with_default_language(mut self, locale: Locale) -> Self {
        self.default_language = Some(locale);
        self
    }

    /// Set the title used when a document has none.
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = Some(title.into());
        self
    }

    /// Set the rasterization resolution.
    pub fn with_raster_dpi(mut self, dpi: f32) -> Self {
        self.raster_dpi = dpi.max(1.0);
        self
    }

    /// Rasterize pages on a thread pool.
    pub fn with_raster_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.raster_pool = Some(pool);
        self
    }

    /// Use a custom rasterizer.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Add a substitution font.
    pub fn with_font(mut self, font: Arc<OpenTypeFont>) -> Self {
        self.font_pool.push(font);
        self
    }

    /// Add an ICC profile colors may be converted to.
    pub fn with_icc_profile(mut self, profile: Arc<IccProfile>) -> Self {
        self.icc_pool.push(profile);
        self
    }
}

/// Targets and resources of a
/// [`PdfAConversion`](crate::profile::PdfAConversion).
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Targets a document may already claim. Empty means claims are
    /// ignored and the default target is used.
    pub allowed: Vec<StandardProfile>,

    /// Extra profiles kept when the document already meets them.
    pub retained: Vec<OutputProfile>,

    /// Target used when the document claims none of the allowed ones.
    pub default_target: StandardProfile,

    /// Destination profile of the output intent, chosen from the pool
    /// when unset.
    pub intent_space: Option<Arc<IccProfile>>,

    /// Repair settings, including the ICC and font pools.
    pub profiler: ProfilerConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionConfig {
    /// Create new configuration: PDF/A-1a by default, keeping PDF/X-4
    /// and PDF/UA-1 when already met.
    pub fn new() -> Self {
        Self {
            allowed: Vec::new(),
            retained: vec![StandardProfile::PdfX4.profile(), StandardProfile::PdfUa1.profile()],
            default_target: StandardProfile::PdfA1a,
            intent_space: None,
            profiler: ProfilerConfig::new(),
        }
    }

    /// Accept any PDF/A target, PDF/A-1b by default.
    pub fn any_pdfa() -> Self {
        Self::new()
            .with_default_target(StandardProfile::PdfA1b)
            .with_allowed(StandardProfile::ALL.iter().copied().filter(|s| s.is_pdfa()))
    }

    /// Set the allowed targets.
    pub fn with_allowed(mut self, allowed: impl IntoIterator<Item = StandardProfile>) -> Self {
        self.allowed = allowed.into_iter().collect();
        self
    }

    /// Set the retained profiles.
    pub fn with_retained(mut self, retained: impl IntoIterator<Item = OutputProfile>) -> Self {
        self.retained = retained.into_iter().collect();
        self
    }

    /// Set the default target.
    pub fn with_default_target(mut self, target: StandardProfile) -> Self {
        self.default_target = target;
        self
    }

    /// Use this profile for the output intent.
    pub fn with_intent_space(mut self, profile: Arc<IccProfile>) -> Self {
        self.intent_space = Some(profile);
        self
    }

    /// Set the repair settings.
    pub fn with_profiler(mut self, profiler: ProfilerConfig) -> Self {
        self.profiler = profiler;
        self
    }
}
