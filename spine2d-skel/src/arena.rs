//! Pooled storage for strings decoded during a single `.skel` read.
//!
//! `.skel` strings are not decoded as UTF-8. Exporters write them with a restricted
//! multi-byte scheme: lead bytes `0xC_`/`0xD_` take one continuation byte, `0xE_` takes two,
//! and every other byte (including stray continuation bytes and `0xF_` leads) stands for
//! itself. The result is a sequence of 16-bit code units. Existing assets depend on this, so
//! it is replicated here instead of using `str::from_utf8`.

/// Handle to a string stored in a [`StringArena`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ArenaStr {
    start: usize,
    len: usize,
}

impl ArenaStr {
    pub fn len(self) -> usize {
        self.len
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

#[derive(Clone, Debug, Default)]
pub struct StringArena {
    text: String,
    units: Vec<u16>,
    count: usize,
}

impl StringArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            text: String::with_capacity(bytes),
            units: Vec::new(),
            count: 0,
        }
    }

    /// Expands `bytes` with the restricted decoding and appends the result.
    ///
    /// Fails when a lead byte needs continuation bytes beyond the end of `bytes`.
    pub fn push_encoded(&mut self, bytes: &[u8]) -> Result<ArenaStr, String> {
        self.units.clear();
        expand_restricted(bytes, &mut self.units)?;

        let start = self.text.len();
        self.text.extend(
            char::decode_utf16(self.units.iter().copied())
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
        );
        self.count += 1;
        Ok(ArenaStr {
            start,
            len: self.text.len() - start,
        })
    }

    pub fn get(&self, s: ArenaStr) -> &str {
        &self.text[s.start..s.start + s.len]
    }

    /// Number of strings pushed since creation or the last [`StringArena::clear`].
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total text bytes held.
    pub fn text_len(&self) -> usize {
        self.text.len()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.units.clear();
        self.count = 0;
    }
}

fn expand_restricted(bytes: &[u8], out: &mut Vec<u16>) -> Result<(), String> {
    let need = |i: usize, n: usize| {
        if i + n >= bytes.len() {
            Err(format!(
                "lead byte 0x{:02x} at {i} needs {n} continuation bytes (len={})",
                bytes[i],
                bytes.len()
            ))
        } else {
            Ok(())
        }
    };

    out.reserve(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b >> 4 {
            0xC | 0xD => {
                need(i, 1)?;
                let b2 = (bytes[i + 1] & 0x3F) as u16;
                out.push((((b & 0x1F) as u16) << 6) | b2);
                i += 2;
            }
            0xE => {
                need(i, 2)?;
                let b2 = (bytes[i + 1] & 0x3F) as u16;
                let b3 = (bytes[i + 2] & 0x3F) as u16;
                out.push((((b & 0x0F) as u16) << 12) | (b2 << 6) | b3);
                i += 3;
            }
            _ => {
                out.push(b as u16);
                i += 1;
            }
        }
    }
    Ok(())
}
