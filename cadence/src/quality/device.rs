//! Host device characteristics.

use std::fmt;
use std::sync::Arc;

/// Renderer substrings that identify a software rasterizer.
const SOFTWARE_RENDERERS: &[&str] = &[
    "swiftshader",
    "llvmpipe",
    "softpipe",
    "software",
    "microsoft basic render",
];

/// Coarse device class reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormFactor {
    /// Desktop or laptop.
    #[default]
    Desktop,
    /// Tablet-sized touch device.
    Tablet,
    /// Phone.
    Mobile,
}

impl FormFactor {
    /// Classify a user-agent string.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ua.contains("ipad") || ua.contains("tablet") {
            FormFactor::Tablet
        } else if ua.contains("mobi") || ua.contains("iphone") || ua.contains("android") {
            FormFactor::Mobile
        } else {
            FormFactor::Desktop
        }
    }

    /// Whether the device counts as "mobile" for animation budgeting.
    ///
    /// Tablets share phone GPUs and thermal limits, so they count.
    pub fn is_mobile(&self) -> bool {
        matches!(self, FormFactor::Mobile | FormFactor::Tablet)
    }
}

impl fmt::Display for FormFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormFactor::Desktop => write!(f, "desktop"),
            FormFactor::Tablet => write!(f, "tablet"),
            FormFactor::Mobile => write!(f, "mobile"),
        }
    }
}

type MemoryProbe = Arc<dyn Fn() -> Option<f64> + Send + Sync>;

/// What the host knows about the device it renders on.
#[derive(Clone, Default)]
pub struct DeviceProfile {
    /// GPU renderer string, if the host can read one.
    pub gpu_renderer: Option<String>,
    /// Device class.
    pub form_factor: FormFactor,
    memory_probe: Option<MemoryProbe>,
}

impl DeviceProfile {
    /// Profile with a known renderer and device class.
    pub fn new(gpu_renderer: Option<String>, form_factor: FormFactor) -> Self {
        Self {
            gpu_renderer,
            form_factor,
            memory_probe: None,
        }
    }

    /// Attach a probe returning current memory usage in megabytes.
    pub fn with_memory_probe<F>(mut self, probe: F) -> Self
    where
        F: Fn() -> Option<f64> + Send + Sync + 'static,
    {
        self.memory_probe = Some(Arc::new(probe));
        self
    }

    /// GPU capability heuristic.
    ///
    /// Capable iff the host reports a renderer and it is not a known
    /// software rasterizer.
    pub fn has_capable_gpu(&self) -> bool {
        match &self.gpu_renderer {
            Some(renderer) => {
                let renderer = renderer.to_ascii_lowercase();
                !renderer.trim().is_empty()
                    && !SOFTWARE_RENDERERS.iter().any(|sw| renderer.contains(sw))
            }
            None => false,
        }
    }

    /// Whether the device is classified as mobile.
    pub fn is_mobile(&self) -> bool {
        self.form_factor.is_mobile()
    }

    /// Current memory usage in megabytes, if a probe is attached.
    pub fn memory_usage_mb(&self) -> Option<f64> {
        self.memory_probe.as_ref().and_then(|probe| probe())
    }
}

impl fmt::Debug for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceProfile")
            .field("gpu_renderer", &self.gpu_renderer)
            .field("form_factor", &self.form_factor)
            .field("memory_probe", &self.memory_probe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_renderer_is_capable() {
        let device = DeviceProfile::new(
            Some("ANGLE (NVIDIA GeForce RTX 3070 Direct3D11)".to_string()),
            FormFactor::Desktop,
        );
        assert!(device.has_capable_gpu());
    }

    #[test]
    fn test_software_renderers_are_not_capable() {
        for renderer in ["Google SwiftShader", "llvmpipe (LLVM 15.0.7, 256 bits)", ""] {
            let device = DeviceProfile::new(Some(renderer.to_string()), FormFactor::Desktop);
            assert!(!device.has_capable_gpu(), "{renderer} should not be capable");
        }
    }

    #[test]
    fn test_missing_renderer_is_not_capable() {
        assert!(!DeviceProfile::default().has_capable_gpu());
    }

    #[test]
    fn test_form_factor_from_user_agent() {
        assert_eq!(
            FormFactor::from_user_agent(
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148"
            ),
            FormFactor::Mobile
        );
        assert_eq!(
            FormFactor::from_user_agent("Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)"),
            FormFactor::Tablet
        );
        assert_eq!(
            FormFactor::from_user_agent("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0"),
            FormFactor::Desktop
        );
    }

    #[test]
    fn test_memory_probe() {
        let device = DeviceProfile::default().with_memory_probe(|| Some(128.5));
        assert_eq!(device.memory_usage_mb(), Some(128.5));
        assert_eq!(DeviceProfile::default().memory_usage_mb(), None);
    }
}
