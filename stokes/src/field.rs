use crate::render::{self, Context, Problem, Texture, TextureOptions};

use half::f16;
use rustc_hash::FxHashMap;

// GL 3.3 guarantees at least 16 texture units in the fragment stage.
pub const MAX_SLOTS: u32 = 16;

/// Every field the solver allocates, in slot order.
pub static FIELD_NAMES: [&str; 7] = [
    "velocity",
    "pressure",
    "divergence",
    "scratch",
    "carrier",
    "carrier_next",
    "initial",
];

/// The field that receives asynchronously loaded image data.
pub const IMAGE_FIELD: &str = "initial";

/// A stable handle to one of the simulation fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Field(usize);

/// Hands out texture units. A unit, once given out, is never reused.
#[derive(Debug)]
pub struct Slots {
    next: u32,
    max: u32,
}

impl Default for Slots {
    fn default() -> Self {
        Self::with_capacity(MAX_SLOTS)
    }
}

impl Slots {
    pub fn with_capacity(max: u32) -> Self {
        Self { next: 0, max }
    }

    pub fn allocate(&mut self) -> Result<u32, Problem> {
        if self.next >= self.max {
            return Err(Problem::NoFreeSlot);
        }

        let slot = self.next;
        self.next += 1;
        Ok(slot)
    }
}

/// The bank of simulation fields. Created once, never resized or destroyed
/// while the simulation runs.
pub struct Fields {
    names: FxHashMap<&'static str, Field>,
    textures: Vec<Texture>,
}

impl Fields {
    pub fn new(context: &Context, size: u32) -> Result<Self, Problem> {
        let mut slots = Slots::default();
        let mut names = FxHashMap::default();
        let mut textures = Vec::with_capacity(FIELD_NAMES.len());

        for name in FIELD_NAMES {
            let options = field_options(name);
            let mut texture = Texture::new(context, name, size, size, options)?;

            match options.format {
                glow::RGBA8 => {
                    let zeroes = vec![0u8; render::data_len(4, size, size)];
                    texture.with_data(Some(zeroes.as_slice()))?;
                }
                _ => {
                    let zeroes = vec![f16::ZERO; render::data_len(4, size, size)];
                    texture.with_data(Some(zeroes.as_slice()))?;
                }
            }

            texture.bind(slots.allocate()?)?;
            log::debug!(
                "Allocated field `{}` ({}x{}) on slot {:?}",
                name,
                size,
                size,
                texture.slot()
            );

            names.insert(name, Field(textures.len()));
            textures.push(texture);
        }

        Ok(Self { names, textures })
    }

    pub fn lookup(&self, name: &str) -> Option<Field> {
        self.names.get(name).copied()
    }

    pub fn texture(&self, field: Field) -> &Texture {
        &self.textures[field.0]
    }

    pub fn populate(&self, field: Field, pixels: &[u8]) -> Result<(), Problem> {
        self.texture(field).populate(pixels)
    }
}

/// Handles for every field name, in slot order, without touching the GPU.
pub fn field_handles() -> impl Iterator<Item = (&'static str, Field)> {
    FIELD_NAMES
        .iter()
        .enumerate()
        .map(|(index, name)| (*name, Field(index)))
}

pub fn field_name(field: Field) -> &'static str {
    FIELD_NAMES[field.0]
}

fn field_options(name: &str) -> TextureOptions {
    if name == IMAGE_FIELD {
        TextureOptions {
            format: glow::RGBA8,
            ..Default::default()
        }
    } else {
        TextureOptions::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slots_are_unique() {
        let mut slots = Slots::default();
        let allocated: Vec<u32> = (0..MAX_SLOTS).map(|_| slots.allocate().unwrap()).collect();

        let mut deduplicated = allocated.clone();
        deduplicated.dedup();
        assert_eq!(allocated, deduplicated);
        assert_eq!(allocated.first(), Some(&0));
        assert_eq!(allocated.last(), Some(&(MAX_SLOTS - 1)));
    }

    #[test]
    fn slots_run_out() {
        let mut slots = Slots::with_capacity(2);
        slots.allocate().unwrap();
        slots.allocate().unwrap();
        assert!(matches!(slots.allocate(), Err(Problem::NoFreeSlot)));
    }

    #[test]
    fn every_field_fits_in_the_slot_bank() {
        assert!(FIELD_NAMES.len() as u32 <= MAX_SLOTS);
    }

    #[test]
    fn handles_follow_slot_order() {
        let handles: Vec<_> = field_handles().collect();
        assert_eq!(handles[0], ("velocity", Field(0)));
        assert_eq!(handles[6], (IMAGE_FIELD, Field(6)));
    }

    #[test]
    fn only_the_image_field_is_byte_sized() {
        for name in FIELD_NAMES {
            let expected = if name == IMAGE_FIELD {
                glow::RGBA8
            } else {
                glow::RGBA16F
            };
            assert_eq!(field_options(name).format, expected, "{}", name);
        }
    }
}
