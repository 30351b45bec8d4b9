//! CCITT Group 4 (ITU-T T.6) bi-level coding.
//!
//! Group 4 is a pure two-dimensional scheme: every row is coded against the
//! row above it (the *reference line*) using vertical, horizontal and pass
//! modes; there are no per-row EOL codes. The first row uses an imaginary
//! all-white reference line, and the strip ends with an EOFB marker.
//!
//! The run-length code tables are the standard T.4 terminating and make-up
//! codes, including the extended make-ups to 2560. Runs longer than 2560
//! pixels are coded with repeated 2560 make-ups, which every conformant
//! reader accepts.
//!
//! [`decode`] is the exact inverse of [`encode`] and exists so the merged
//! TIFF can be verified (page dimensions and per-pixel content) without
//! shelling out to external tools.

use crate::pipeline::bilevel::BilevelPage;
use thiserror::Error;

/// Errors from [`decode`]. Encoding is infallible.
#[derive(Debug, Error)]
pub enum G4Error {
    /// The bit stream ended mid-code.
    #[error("truncated Group-4 stream at bit {0}")]
    Truncated(usize),

    /// No mode or run-length code matched the next bits.
    #[error("invalid Group-4 code near bit {0}")]
    InvalidCode(usize),

    /// A decoded row ran past the declared image width.
    #[error("Group-4 row {row} overruns the declared width {width}")]
    RowOverrun { row: u32, width: u32 },
}

// ── Code tables (ITU-T T.4 §4.2.1) ───────────────────────────────────────
//
// Codes are stored right-aligned: (bits, bit_count), written MSB-first.

type Code = (u16, u8);

#[rustfmt::skip]
const WHITE_TERM: [Code; 64] = [
    (0x35, 8), (0x07, 6), (0x07, 4), (0x08, 4), (0x0B, 4), (0x0C, 4), (0x0E, 4), (0x0F, 4),
    (0x13, 5), (0x14, 5), (0x07, 5), (0x08, 5), (0x08, 6), (0x03, 6), (0x34, 6), (0x35, 6),
    (0x2A, 6), (0x2B, 6), (0x27, 7), (0x0C, 7), (0x08, 7), (0x17, 7), (0x03, 7), (0x04, 7),
    (0x28, 7), (0x2B, 7), (0x13, 7), (0x24, 7), (0x18, 7), (0x02, 8), (0x03, 8), (0x1A, 8),
    (0x1B, 8), (0x12, 8), (0x13, 8), (0x14, 8), (0x15, 8), (0x16, 8), (0x17, 8), (0x28, 8),
    (0x29, 8), (0x2A, 8), (0x2B, 8), (0x2C, 8), (0x2D, 8), (0x04, 8), (0x05, 8), (0x0A, 8),
    (0x0B, 8), (0x52, 8), (0x53, 8), (0x54, 8), (0x55, 8), (0x24, 8), (0x25, 8), (0x58, 8),
    (0x59, 8), (0x5A, 8), (0x5B, 8), (0x4A, 8), (0x4B, 8), (0x32, 8), (0x33, 8), (0x34, 8),
];

#[rustfmt::skip]
const BLACK_TERM: [Code; 64] = [
    (0x37, 10), (0x02, 3),  (0x03, 2),  (0x02, 2),  (0x03, 3),  (0x03, 4),  (0x02, 4),  (0x03, 5),
    (0x05, 6),  (0x04, 6),  (0x04, 7),  (0x05, 7),  (0x07, 7),  (0x04, 8),  (0x07, 8),  (0x18, 9),
    (0x17, 10), (0x18, 10), (0x08, 10), (0x67, 11), (0x68, 11), (0x6C, 11), (0x37, 11), (0x28, 11),
    (0x17, 11), (0x18, 11), (0xCA, 12), (0xCB, 12), (0xCC, 12), (0xCD, 12), (0x68, 12), (0x69, 12),
    (0x6A, 12), (0x6B, 12), (0xD2, 12), (0xD3, 12), (0xD4, 12), (0xD5, 12), (0xD6, 12), (0xD7, 12),
    (0x6C, 12), (0x6D, 12), (0xDA, 12), (0xDB, 12), (0x54, 12), (0x55, 12), (0x56, 12), (0x57, 12),
    (0x64, 12), (0x65, 12), (0x52, 12), (0x53, 12), (0x24, 12), (0x37, 12), (0x38, 12), (0x27, 12),
    (0x28, 12), (0x58, 12), (0x59, 12), (0x2B, 12), (0x2C, 12), (0x5A, 12), (0x66, 12), (0x67, 12),
];

/// Make-up codes for runs 64, 128, …, 1728 (index = run / 64 - 1).
#[rustfmt::skip]
const WHITE_MAKEUP: [Code; 27] = [
    (0x1B, 5), (0x12, 5), (0x17, 6), (0x37, 7), (0x36, 8), (0x37, 8), (0x64, 8), (0x65, 8),
    (0x68, 8), (0x67, 8), (0xCC, 9), (0xCD, 9), (0xD2, 9), (0xD3, 9), (0xD4, 9), (0xD5, 9),
    (0xD6, 9), (0xD7, 9), (0xD8, 9), (0xD9, 9), (0xDA, 9), (0xDB, 9), (0x98, 9), (0x99, 9),
    (0x9A, 9), (0x18, 6), (0x9B, 9),
];

#[rustfmt::skip]
const BLACK_MAKEUP: [Code; 27] = [
    (0x0F, 10), (0xC8, 12), (0xC9, 12), (0x5B, 12), (0x33, 12), (0x34, 12), (0x35, 12), (0x6C, 13),
    (0x6D, 13), (0x4A, 13), (0x4B, 13), (0x4C, 13), (0x4D, 13), (0x72, 13), (0x73, 13), (0x74, 13),
    (0x75, 13), (0x76, 13), (0x77, 13), (0x52, 13), (0x53, 13), (0x54, 13), (0x55, 13), (0x5A, 13),
    (0x5B, 13), (0x64, 13), (0x65, 13),
];

/// Extended make-ups for 1792, 1856, …, 2560, shared by both colours
/// (index = (run - 1792) / 64).
#[rustfmt::skip]
const EXT_MAKEUP: [Code; 13] = [
    (0x08, 11), (0x0C, 11), (0x0D, 11), (0x12, 12), (0x13, 12), (0x14, 12), (0x15, 12),
    (0x16, 12), (0x17, 12), (0x1C, 12), (0x1D, 12), (0x1E, 12), (0x1F, 12),
];

// ── Bit I/O ──────────────────────────────────────────────────────────────

struct BitWriter {
    out: Vec<u8>,
    acc: u8,
    used: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            out: Vec::new(),
            acc: 0,
            used: 0,
        }
    }

    /// Append the low `len` bits of `code`, MSB-first.
    fn put(&mut self, code: u16, len: u8) {
        for i in (0..len).rev() {
            self.acc <<= 1;
            self.acc |= ((code >> i) & 1) as u8;
            self.used += 1;
            if self.used == 8 {
                self.out.push(self.acc);
                self.acc = 0;
                self.used = 0;
            }
        }
    }

    /// Pad the final partial byte with zero bits and return the stream.
    fn finish(mut self) -> Vec<u8> {
        if self.used > 0 {
            self.acc <<= 8 - self.used;
            self.out.push(self.acc);
        }
        self.out
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next_bit(&mut self) -> Result<u16, G4Error> {
        let byte = self
            .data
            .get(self.pos / 8)
            .ok_or(G4Error::Truncated(self.pos))?;
        let bit = (byte >> (7 - self.pos % 8)) & 1;
        self.pos += 1;
        Ok(bit as u16)
    }
}

// ── Encoder ──────────────────────────────────────────────────────────────

/// Encode one 1-bit page as a Group-4 strip, terminated by EOFB.
pub fn encode(page: &BilevelPage) -> Vec<u8> {
    let w = page.width() as i64;
    let mut bw = BitWriter::new();

    let mut reference: Option<u32> = None; // previous row; None = all white
    for y in 0..page.height() {
        encode_row(&mut bw, page, y, reference, w);
        reference = Some(y);
    }

    // EOFB: two EOL codes.
    bw.put(0x001, 12);
    bw.put(0x001, 12);
    bw.finish()
}

fn row_bit(page: &BilevelPage, row: Option<u32>, x: i64, w: i64) -> bool {
    match row {
        Some(y) if x >= 0 && x < w => page.is_black(x as u32, y),
        _ => false,
    }
}

/// First changing element strictly right of `after` (or at 0 when
/// `after` is the imaginary start position -1). Returns `w` if none.
fn next_changing(page: &BilevelPage, row: Option<u32>, after: i64, w: i64) -> i64 {
    if row.is_none() {
        return w;
    }
    let mut x = (after + 1).max(0);
    while x < w {
        if row_bit(page, row, x, w) != row_bit(page, row, x - 1, w) {
            return x;
        }
        x += 1;
    }
    w
}

/// First changing element right of `after` whose new colour is
/// `want_black`. Returns `w` if none.
fn next_changing_of_colour(
    page: &BilevelPage,
    row: Option<u32>,
    after: i64,
    want_black: bool,
    w: i64,
) -> i64 {
    let mut x = next_changing(page, row, after, w);
    while x < w && row_bit(page, row, x, w) != want_black {
        x = next_changing(page, row, x, w);
    }
    x
}

fn encode_row(bw: &mut BitWriter, page: &BilevelPage, y: u32, reference: Option<u32>, w: i64) {
    let cur = Some(y);
    let mut a0: i64 = -1; // imaginary white element before the row
    let mut a0_black = false;

    loop {
        let a1 = next_changing(page, cur, a0, w);
        let b1 = next_changing_of_colour(page, reference, a0, !a0_black, w);
        let b2 = next_changing(page, reference, b1, w);

        if b2 < a1 {
            // Pass mode: the reference run ends before the coding run does.
            bw.put(0b0001, 4);
            a0 = b2;
        } else if (a1 - b1).abs() <= 3 {
            match a1 - b1 {
                0 => bw.put(0b1, 1),
                1 => bw.put(0b011, 3),
                2 => bw.put(0b000011, 6),
                3 => bw.put(0b0000011, 7),
                -1 => bw.put(0b010, 3),
                -2 => bw.put(0b000010, 6),
                -3 => bw.put(0b0000010, 7),
                _ => unreachable!("vertical offset bounded by ±3"),
            }
            a0 = a1;
            a0_black = !a0_black;
        } else {
            // Horizontal mode: two explicit run lengths, colour unchanged.
            let a2 = next_changing(page, cur, a1, w);
            let start = a0.max(0);
            bw.put(0b001, 3);
            put_run(bw, a0_black, (a1 - start) as u32);
            put_run(bw, !a0_black, (a2 - a1) as u32);
            a0 = a2;
        }

        if a0 >= w {
            break;
        }
    }
}

/// Emit the make-up + terminating codes for one run.
fn put_run(bw: &mut BitWriter, black: bool, mut run: u32) {
    while run >= 64 {
        let chunk = ((run / 64) * 64).min(2560);
        let (code, len) = if chunk <= 1728 {
            let table = if black { &BLACK_MAKEUP } else { &WHITE_MAKEUP };
            table[(chunk / 64 - 1) as usize]
        } else {
            EXT_MAKEUP[((chunk - 1792) / 64) as usize]
        };
        bw.put(code, len);
        run -= chunk;
    }
    let (code, len) = if black {
        BLACK_TERM[run as usize]
    } else {
        WHITE_TERM[run as usize]
    };
    bw.put(code, len);
}

// ── Decoder ──────────────────────────────────────────────────────────────

enum Mode {
    Pass,
    Vertical(i8),
    Horizontal,
    Eol,
}

fn read_mode(br: &mut BitReader) -> Result<Mode, G4Error> {
    if br.next_bit()? == 1 {
        return Ok(Mode::Vertical(0));
    }
    if br.next_bit()? == 1 {
        // 01x
        return Ok(if br.next_bit()? == 1 {
            Mode::Vertical(1)
        } else {
            Mode::Vertical(-1)
        });
    }
    if br.next_bit()? == 1 {
        return Ok(Mode::Horizontal); // 001
    }
    if br.next_bit()? == 1 {
        return Ok(Mode::Pass); // 0001
    }
    if br.next_bit()? == 1 {
        // 00001x
        return Ok(if br.next_bit()? == 1 {
            Mode::Vertical(2)
        } else {
            Mode::Vertical(-2)
        });
    }
    if br.next_bit()? == 1 {
        // 000001x
        return Ok(if br.next_bit()? == 1 {
            Mode::Vertical(3)
        } else {
            Mode::Vertical(-3)
        });
    }
    // Six zeros and counting: the only legal continuation is EOL/EOFB.
    Ok(Mode::Eol)
}

fn lookup_run(black: bool, bits: u16, len: u8) -> Option<(u32, bool)> {
    let (term, makeup): (&[Code; 64], &[Code; 27]) = if black {
        (&BLACK_TERM, &BLACK_MAKEUP)
    } else {
        (&WHITE_TERM, &WHITE_MAKEUP)
    };
    if let Some(run) = term.iter().position(|&c| c == (bits, len)) {
        return Some((run as u32, true));
    }
    if let Some(i) = makeup.iter().position(|&c| c == (bits, len)) {
        return Some(((i as u32 + 1) * 64, false));
    }
    if let Some(i) = EXT_MAKEUP.iter().position(|&c| c == (bits, len)) {
        return Some((1792 + i as u32 * 64, false));
    }
    None
}

/// Read one full run length (make-ups followed by a terminating code).
fn read_run(br: &mut BitReader, black: bool) -> Result<u32, G4Error> {
    let mut total = 0u32;
    loop {
        let mut bits = 0u16;
        let mut len = 0u8;
        let (run, terminating) = loop {
            bits = (bits << 1) | br.next_bit()?;
            len += 1;
            if len > 13 {
                return Err(G4Error::InvalidCode(br.pos));
            }
            if let Some(hit) = lookup_run(black, bits, len) {
                break hit;
            }
        };
        total += run;
        if terminating {
            return Ok(total);
        }
    }
}

/// Changing elements of the reference row, alternating colours starting
/// with white→black. `b1` is the first element right of `a0` whose new
/// colour is opposite to `a0`'s colour.
fn ref_b1(reference: &[i64], a0: i64, a0_black: bool, w: i64) -> i64 {
    for (i, &x) in reference.iter().enumerate() {
        let to_black = i % 2 == 0;
        if x > a0 && to_black != a0_black {
            return x;
        }
    }
    w
}

fn ref_next(reference: &[i64], after: i64, w: i64) -> i64 {
    reference.iter().copied().find(|&x| x > after).unwrap_or(w)
}

/// Decode a Group-4 strip of known dimensions back into a [`BilevelPage`].
///
/// Trailing EOFB bits and byte padding are ignored once `height` rows have
/// been reconstructed.
pub fn decode(data: &[u8], width: u32, height: u32) -> Result<BilevelPage, G4Error> {
    let w = width as i64;
    let mut br = BitReader::new(data);
    let mut page = BilevelPage::blank(width, height);
    let mut reference: Vec<i64> = Vec::new();

    for y in 0..height {
        let mut changes: Vec<i64> = Vec::new();
        let mut a0: i64 = -1;
        let mut a0_black = false;

        while a0 < w {
            let b1 = ref_b1(&reference, a0, a0_black, w);
            let b2 = ref_next(&reference, b1, w);

            match read_mode(&mut br)? {
                Mode::Pass => {
                    a0 = b2;
                }
                Mode::Vertical(d) => {
                    let a1 = b1 + d as i64;
                    if a1 < 0 || a1 > w {
                        return Err(G4Error::RowOverrun { row: y, width });
                    }
                    changes.push(a1);
                    a0 = a1;
                    a0_black = !a0_black;
                }
                Mode::Horizontal => {
                    let r1 = read_run(&mut br, a0_black)? as i64;
                    let r2 = read_run(&mut br, !a0_black)? as i64;
                    let start = a0.max(0);
                    let a1 = start + r1;
                    let a2 = a1 + r2;
                    if a2 > w {
                        return Err(G4Error::RowOverrun { row: y, width });
                    }
                    changes.push(a1);
                    changes.push(a2);
                    a0 = a2;
                }
                Mode::Eol => {
                    return Err(G4Error::Truncated(br.pos));
                }
            }
        }

        // Paint black runs: changes alternate white→black / black→white.
        for pair in changes.chunks(2) {
            let from = pair[0].clamp(0, w);
            let to = pair.get(1).copied().unwrap_or(w).clamp(0, w);
            for x in from..to {
                page.set_black(x as u32, y);
            }
        }

        // Imaginary elements at or past the right edge are not reference
        // transitions; drop them along with cancelling equal pairs.
        reference = normalize_changes(changes, w);
    }

    Ok(page)
}

fn normalize_changes(changes: Vec<i64>, w: i64) -> Vec<i64> {
    let mut out: Vec<i64> = Vec::with_capacity(changes.len());
    for x in changes {
        if x >= w {
            continue;
        }
        if out.last() == Some(&x) {
            // zero-length run: the two transitions cancel
            out.pop();
        } else {
            out.push(x);
        }
    }
    out
}
