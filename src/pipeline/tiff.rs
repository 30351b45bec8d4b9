//! Multi-page TIFF container for Group-4 fax pages.
//!
//! The writer emits little-endian baseline TIFF with one IFD per page and
//! the whole page in a single strip, which is what fax consumers expect.
//! The layout is computed up front so the file can be written in one
//! sequential pass: per page the strip data (padded to a word boundary),
//! the two external RATIONAL resolution values, then the IFD itself.
//!
//! [`read_multipage`] is a deliberately small reader, just enough to walk
//! the IFD chain and pull out the fields and strips the writer produced.

use std::io::{self, Write};

use thiserror::Error;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_SAMPLES_PER_PIXEL: u16 = 277;
const TAG_ROWS_PER_STRIP: u16 = 278;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;
const TAG_X_RESOLUTION: u16 = 282;
const TAG_Y_RESOLUTION: u16 = 283;
const TAG_T6_OPTIONS: u16 = 293;
const TAG_RESOLUTION_UNIT: u16 = 296;

/// CCITT Group 4 in tag 259.
pub const COMPRESSION_G4: u16 = 4;
/// WhiteIsZero: a set bit is a black pixel.
pub const PHOTOMETRIC_MIN_IS_WHITE: u16 = 0;

const ENTRIES_PER_IFD: u32 = 13;
const IFD_SIZE: u32 = 2 + ENTRIES_PER_IFD * 12 + 4;

/// One page ready for the container: dimensions plus its Group-4 strip.
#[derive(Debug, Clone)]
pub struct TiffPage {
    pub width: u32,
    pub height: u32,
    pub g4: Vec<u8>,
}

fn padded(len: usize) -> u32 {
    (len as u32 + 1) & !1
}

/// Write `pages` as a chained multi-page TIFF. `dpi` lands in the
/// X/YResolution tags with ResolutionUnit = inch.
pub fn write_multipage(out: &mut dyn Write, pages: &[TiffPage], dpi: u32) -> io::Result<()> {
    debug_assert!(!pages.is_empty());

    // Offsets for every block, in file order.
    let mut offset = 8u32; // header
    let mut layout = Vec::with_capacity(pages.len());
    for page in pages {
        let strip = offset;
        let xres = strip + padded(page.g4.len());
        let yres = xres + 8;
        let ifd = yres + 8;
        layout.push((strip, xres, yres, ifd));
        offset = ifd + IFD_SIZE;
    }

    out.write_all(b"II")?;
    out.write_all(&42u16.to_le_bytes())?;
    out.write_all(&layout[0].3.to_le_bytes())?;

    for (i, page) in pages.iter().enumerate() {
        let (_, xres_off, yres_off, _) = layout[i];
        let next_ifd = layout.get(i + 1).map_or(0, |l| l.3);

        out.write_all(&page.g4)?;
        if page.g4.len() % 2 != 0 {
            out.write_all(&[0])?;
        }
        // X/YResolution as pixels per inch.
        out.write_all(&dpi.to_le_bytes())?;
        out.write_all(&1u32.to_le_bytes())?;
        out.write_all(&dpi.to_le_bytes())?;
        out.write_all(&1u32.to_le_bytes())?;

        out.write_all(&(ENTRIES_PER_IFD as u16).to_le_bytes())?;
        // Entries must be in ascending tag order.
        write_entry(out, TAG_IMAGE_WIDTH, TYPE_LONG, page.width)?;
        write_entry(out, TAG_IMAGE_LENGTH, TYPE_LONG, page.height)?;
        write_entry(out, TAG_BITS_PER_SAMPLE, TYPE_SHORT, 1)?;
        write_entry(out, TAG_COMPRESSION, TYPE_SHORT, COMPRESSION_G4 as u32)?;
        write_entry(out, TAG_PHOTOMETRIC, TYPE_SHORT, PHOTOMETRIC_MIN_IS_WHITE as u32)?;
        write_entry(out, TAG_STRIP_OFFSETS, TYPE_LONG, layout[i].0)?;
        write_entry(out, TAG_SAMPLES_PER_PIXEL, TYPE_SHORT, 1)?;
        write_entry(out, TAG_ROWS_PER_STRIP, TYPE_LONG, page.height)?;
        write_entry(out, TAG_STRIP_BYTE_COUNTS, TYPE_LONG, page.g4.len() as u32)?;
        write_rational_entry(out, TAG_X_RESOLUTION, xres_off)?;
        write_rational_entry(out, TAG_Y_RESOLUTION, yres_off)?;
        write_entry(out, TAG_T6_OPTIONS, TYPE_LONG, 0)?;
        write_entry(out, TAG_RESOLUTION_UNIT, TYPE_SHORT, 2)?;
        out.write_all(&next_ifd.to_le_bytes())?;
    }

    Ok(())
}

fn write_entry(out: &mut dyn Write, tag: u16, ty: u16, value: u32) -> io::Result<()> {
    out.write_all(&tag.to_le_bytes())?;
    out.write_all(&ty.to_le_bytes())?;
    out.write_all(&1u32.to_le_bytes())?;
    // SHORT values occupy the low half of the field; little-endian u32
    // gives exactly that byte layout.
    out.write_all(&value.to_le_bytes())
}

fn write_rational_entry(out: &mut dyn Write, tag: u16, value_offset: u32) -> io::Result<()> {
    out.write_all(&tag.to_le_bytes())?;
    out.write_all(&TYPE_RATIONAL.to_le_bytes())?;
    out.write_all(&1u32.to_le_bytes())?;
    out.write_all(&value_offset.to_le_bytes())
}

// ── Reader ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TiffReadError {
    #[error("not a little-endian TIFF file")]
    BadHeader,

    #[error("file truncated at offset {0}")]
    Truncated(usize),

    #[error("IFD at {0} is missing required tag {1}")]
    MissingTag(u32, u16),

    #[error("IFD chain loops or exceeds {0} pages")]
    TooManyPages(usize),
}

/// Fields extracted from one IFD, with the raw (still compressed) strip.
#[derive(Debug)]
pub struct PageRecord {
    pub width: u32,
    pub height: u32,
    pub compression: u16,
    pub photometric: u16,
    pub bits_per_sample: u16,
    /// XResolution numerator over denominator, i.e. DPI for unit = inch.
    pub x_resolution: (u32, u32),
    pub strip: Vec<u8>,
}

const MAX_PAGES: usize = 10_000;

fn get<const N: usize>(data: &[u8], at: usize) -> Result<[u8; N], TiffReadError> {
    data.get(at..at + N)
        .and_then(|s| s.try_into().ok())
        .ok_or(TiffReadError::Truncated(at))
}

fn read_u16(data: &[u8], at: usize) -> Result<u16, TiffReadError> {
    Ok(u16::from_le_bytes(get::<2>(data, at)?))
}

fn read_u32(data: &[u8], at: usize) -> Result<u32, TiffReadError> {
    Ok(u32::from_le_bytes(get::<4>(data, at)?))
}

/// Walk the IFD chain and return one [`PageRecord`] per page.
pub fn read_multipage(data: &[u8]) -> Result<Vec<PageRecord>, TiffReadError> {
    if data.len() < 8 || &data[0..2] != b"II" || read_u16(data, 2)? != 42 {
        return Err(TiffReadError::BadHeader);
    }

    let mut pages = Vec::new();
    let mut ifd = read_u32(data, 4)?;
    while ifd != 0 {
        if pages.len() >= MAX_PAGES {
            return Err(TiffReadError::TooManyPages(MAX_PAGES));
        }
        let (record, next) = read_ifd(data, ifd)?;
        pages.push(record);
        ifd = next;
    }
    Ok(pages)
}

fn read_ifd(data: &[u8], ifd: u32) -> Result<(PageRecord, u32), TiffReadError> {
    let base = ifd as usize;
    let count = read_u16(data, base)? as usize;

    let tag_value = |wanted: u16| -> Result<u32, TiffReadError> {
        for i in 0..count {
            let entry = base + 2 + i * 12;
            if read_u16(data, entry)? == wanted {
                let ty = read_u16(data, entry + 2)?;
                let raw = entry + 8;
                return match ty {
                    TYPE_SHORT => Ok(read_u16(data, raw)? as u32),
                    _ => read_u32(data, raw),
                };
            }
        }
        Err(TiffReadError::MissingTag(ifd, wanted))
    };

    let width = tag_value(TAG_IMAGE_WIDTH)?;
    let height = tag_value(TAG_IMAGE_LENGTH)?;
    let compression = tag_value(TAG_COMPRESSION)? as u16;
    let photometric = tag_value(TAG_PHOTOMETRIC)? as u16;
    let bits_per_sample = tag_value(TAG_BITS_PER_SAMPLE)? as u16;
    let strip_offset = tag_value(TAG_STRIP_OFFSETS)? as usize;
    let strip_len = tag_value(TAG_STRIP_BYTE_COUNTS)? as usize;
    let xres_at = tag_value(TAG_X_RESOLUTION)? as usize;

    let strip = data
        .get(strip_offset..strip_offset + strip_len)
        .ok_or(TiffReadError::Truncated(strip_offset))?
        .to_vec();
    let x_resolution = (read_u32(data, xres_at)?, read_u32(data, xres_at + 4)?);

    let next = read_u32(data, base + 2 + count * 12)?;
    Ok((
        PageRecord {
            width,
            height,
            compression,
            photometric,
            bits_per_sample,
            x_resolution,
            strip,
        },
        next,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{bilevel::BilevelPage, g4};

    fn page_with_bar(width: u32, height: u32) -> BilevelPage {
        let mut page = BilevelPage::blank(width, height);
        for y in height / 4..height / 2 {
            for x in 0..width {
                page.set_black(x, y);
            }
        }
        page
    }

    fn to_tiff_page(page: &BilevelPage) -> TiffPage {
        TiffPage {
            width: page.width(),
            height: page.height(),
            g4: g4::encode(page),
        }
    }

    #[test]
    fn single_page_fields() {
        let page = page_with_bar(101, 40);
        let mut buf = Vec::new();
        write_multipage(&mut buf, &[to_tiff_page(&page)], 300).unwrap();

        let records = read_multipage(&buf).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!((r.width, r.height), (101, 40));
        assert_eq!(r.compression, COMPRESSION_G4);
        assert_eq!(r.photometric, PHOTOMETRIC_MIN_IS_WHITE);
        assert_eq!(r.bits_per_sample, 1);
        assert_eq!(r.x_resolution, (300, 1));

        let decoded = g4::decode(&r.strip, r.width, r.height).unwrap();
        assert_eq!(decoded, page);
    }

    #[test]
    fn pages_keep_their_order_and_content() {
        let pages: Vec<BilevelPage> = (1..=4).map(|i| page_with_bar(60 + i * 7, 30 + i)).collect();
        let tiff_pages: Vec<TiffPage> = pages.iter().map(to_tiff_page).collect();
        let mut buf = Vec::new();
        write_multipage(&mut buf, &tiff_pages, 204).unwrap();

        let records = read_multipage(&buf).unwrap();
        assert_eq!(records.len(), 4);
        for (record, page) in records.iter().zip(&pages) {
            assert_eq!(record.width, page.width());
            assert_eq!(record.height, page.height());
            let decoded = g4::decode(&record.strip, record.width, record.height).unwrap();
            assert_eq!(&decoded, page);
        }
    }

    #[test]
    fn strips_are_word_aligned() {
        // A blank 200x30 page codes to 30 V0 bits plus EOFB, 7 bytes,
        // so the pad byte before the next block is exercised.
        let page = BilevelPage::blank(200, 30);
        let tp = to_tiff_page(&page);
        assert_eq!(tp.g4.len() % 2, 1);
        let mut buf = Vec::new();
        write_multipage(&mut buf, &[tp.clone(), tp], 300).unwrap();

        let records = read_multipage(&buf).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].strip, records[1].strip);
    }

    #[test]
    fn rejects_foreign_bytes() {
        assert!(read_multipage(b"MM\x00\x2a").is_err());
        assert!(read_multipage(&[]).is_err());
        // Valid header pointing into the void.
        let mut bogus = Vec::from(*b"II\x2a\x00");
        bogus.extend_from_slice(&500u32.to_le_bytes());
        assert!(read_multipage(&bogus).is_err());
    }
}
