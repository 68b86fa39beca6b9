//! Interior material (spec §3/§4.H): index of refraction, caustics, fade, and
//! the attached participating-media chain.
//!
//! Design Notes §9 calls for "shared ownership with copy-on-write variant":
//! `Interior` is built once during scene compose and is immutable afterwards,
//! so sharing it between rays is just an `Arc` clone (`share`); a deep copy
//! (`deep_clone`) is available for the rarer case where the parser semantics
//! require independent values (POV-Ray's `Copy_Interior` vs.
//! `Copy_Interior_Pointer`).

use crate::media::Media;
use crate::pbrt::Float;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct Interior {
    pub ior: Float,
    pub caustics: Float,
    pub fade_distance: Float,
    pub fade_power: Float,
    pub hollow: bool,
    pub media: Vec<Media>,
}

impl Interior {
    pub fn new(ior: Float, caustics: Float, fade_distance: Float, fade_power: Float, hollow: bool) -> Self {
        Self {
            ior,
            caustics,
            fade_distance,
            fade_power,
            hollow,
            media: Vec::new(),
        }
    }

    pub fn with_media(mut self, media: Vec<Media>) -> Self {
        self.media = media;
        self
    }

    /// Bump a shared reference count (`Copy_Interior_Pointer`): cheap,
    /// aliases the same data.
    pub fn share(self: &Arc<Self>) -> Arc<Self> {
        Arc::clone(self)
    }

    /// Deep copy (`Copy_Interior`): an independent value the caller may
    /// mutate without affecting the original (only legal before the scene is
    /// frozen for rendering, per spec §5).
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }

    pub fn has_media_effects(&self) -> bool {
        self.media.iter().any(Media::has_any_effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_aliases_same_allocation() {
        let a = Arc::new(Interior::new(1.5, 0.0, 0.0, 1.0, false));
        let b = a.share();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(Arc::strong_count(&a), 2);
    }

    #[test]
    fn deep_clone_is_independent_value() {
        let a = Interior::new(1.5, 0.0, 0.0, 1.0, false);
        let mut b = a.deep_clone();
        b.ior = 2.0;
        assert_eq!(a.ior, 1.5);
        assert_eq!(b.ior, 2.0);
    }
}
