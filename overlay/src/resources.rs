//! Lazily populated brush and font cache
//!
//! One cache lives on the render thread next to its drawing context. Entries
//! are created on first request and stay alive until [`ResourceCache::dispose`]
//! hands every one of them back to the context. Lookups for an already cached
//! description borrow the caller's data and never allocate.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use gsi_hud_types::Color;
use hashbrown::{Equivalent, HashMap};

use crate::context::{DrawingContext, FontDesc, Resource};
use crate::error::ResourceError;

/// Owned cache key
#[derive(Debug, PartialEq, Eq)]
enum ResourceKey {
    Brush(Color),
    Font(FontKey),
}

#[derive(Debug, PartialEq, Eq)]
struct FontKey {
    family: String,
    size_bits: u32,
    bold: bool,
    italic: bool,
    word_wrap: bool,
}

/// Borrowed view of a key, used for lookups and for hashing both forms
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum KeyRef<'a> {
    Brush(Color),
    Font {
        family: &'a str,
        size_bits: u32,
        bold: bool,
        italic: bool,
        word_wrap: bool,
    },
}

impl ResourceKey {
    fn as_key_ref(&self) -> KeyRef<'_> {
        match self {
            Self::Brush(color) => KeyRef::Brush(*color),
            Self::Font(font) => KeyRef::Font {
                family: &font.family,
                size_bits: font.size_bits,
                bold: font.bold,
                italic: font.italic,
                word_wrap: font.word_wrap,
            },
        }
    }
}

// Must hash exactly like KeyRef so borrowed lookups land in the same bucket
impl Hash for ResourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_key_ref().hash(state);
    }
}

impl Equivalent<ResourceKey> for KeyRef<'_> {
    fn equivalent(&self, key: &ResourceKey) -> bool {
        *self == key.as_key_ref()
    }
}

impl<'a> KeyRef<'a> {
    fn font(desc: &FontDesc<'a>) -> Self {
        // -0.0 and 0.0 differ here; both are rejected by every context anyway
        KeyRef::Font {
            family: desc.family,
            size_bits: desc.size.to_bits(),
            bold: desc.bold,
            italic: desc.italic,
            word_wrap: desc.word_wrap,
        }
    }

    fn to_owned_key(self) -> ResourceKey {
        match self {
            KeyRef::Brush(color) => ResourceKey::Brush(color),
            KeyRef::Font {
                family,
                size_bits,
                bold,
                italic,
                word_wrap,
            } => ResourceKey::Font(FontKey {
                family: family.to_string(),
                size_bits,
                bold,
                italic,
                word_wrap,
            }),
        }
    }
}

/// Brushes and fonts keyed by their full description
pub struct ResourceCache<C: DrawingContext> {
    entries: HashMap<ResourceKey, Resource<C::Brush, C::Font>>,
}

impl<C: DrawingContext> Default for ResourceCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: DrawingContext> ResourceCache<C> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::with_capacity(16),
        }
    }

    /// Get the brush for `color`, creating it on first use
    pub fn brush(
        &mut self,
        context: &mut C,
        color: Color,
    ) -> Result<Rc<C::Brush>, ResourceError> {
        let key = KeyRef::Brush(color);
        if let Some(Resource::Brush(brush)) = self.entries.get(&key) {
            return Ok(Rc::clone(brush));
        }

        let brush = Rc::new(context.create_brush(color)?);
        tracing::trace!(?color, "Created brush");
        self.entries
            .insert(key.to_owned_key(), Resource::Brush(Rc::clone(&brush)));
        Ok(brush)
    }

    /// Get the font matching `desc`, creating it on first use
    pub fn font(
        &mut self,
        context: &mut C,
        desc: &FontDesc<'_>,
    ) -> Result<Rc<C::Font>, ResourceError> {
        let key = KeyRef::font(desc);
        if let Some(Resource::Font(font)) = self.entries.get(&key) {
            return Ok(Rc::clone(font));
        }

        let font = Rc::new(context.create_font(desc)?);
        tracing::debug!(
            family = desc.family,
            size = desc.size,
            bold = desc.bold,
            italic = desc.italic,
            "Created font"
        );
        self.entries
            .insert(key.to_owned_key(), Resource::Font(Rc::clone(&font)));
        Ok(font)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every cached resource back to `context`.
    ///
    /// Returns how many resources were released. Calling it again releases
    /// nothing; the cache can be repopulated afterwards.
    pub fn dispose(&mut self, context: &mut C) -> usize {
        let mut released = 0;
        for (_, resource) in self.entries.drain() {
            context.release(resource);
            released += 1;
        }
        if released > 0 {
            tracing::debug!(released, "Released cached drawing resources");
        }
        released
    }
}
