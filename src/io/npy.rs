//! NumPy `.npy` (format 1.0) arrays of little-endian integers.
//!
//! Only what graph datasets use is supported: `<i8`, `<u8`, `<i4` and `<u4`
//! element types, C order, one or two dimensions.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use regex::Regex;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGN: usize = 64;

const DESCR: &str = r"'descr'\s*:\s*'([^']*)'";
const FORTRAN: &str = r"'fortran_order'\s*:\s*(True|False)";
const SHAPE: &str = r"'shape'\s*:\s*\(([^)]*)\)";

/// On-disk element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DType {
    I8,
    U8,
    I4,
    U4,
}

impl DType {
    fn parse(descr: &str) -> Result<Self> {
        Ok(match descr {
            "<i8" => DType::I8,
            "<u8" => DType::U8,
            "<i4" => DType::I4,
            "<u4" => DType::U4,
            other => bail!("[io::npy] Unsupported dtype '{other}' (expected <i8, <u8, <i4 or <u4)"),
        })
    }

    #[inline]
    fn size(self) -> usize {
        match self {
            DType::I8 | DType::U8 => 8,
            DType::I4 | DType::U4 => 4,
        }
    }
}

/// Integer types an array can be loaded into or saved from.
pub trait NpyElement: Copy {
    const DESCR: &'static str;
    fn from_i64(value: i64) -> Option<Self>;
    fn from_u64(value: u64) -> Option<Self>;
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_npy_element {
    ($ty:ty, $descr:literal) => {
        impl NpyElement for $ty {
            const DESCR: &'static str = $descr;
            #[inline] fn from_i64(value: i64) -> Option<Self> { <$ty>::try_from(value).ok() }
            #[inline] fn from_u64(value: u64) -> Option<Self> { <$ty>::try_from(value).ok() }
            #[inline] fn write_le(self, out: &mut Vec<u8>) { out.extend_from_slice(&self.to_le_bytes()) }
        }
    };
}

impl_npy_element!(i64, "<i8");
impl_npy_element!(u64, "<u8");
impl_npy_element!(i32, "<i4");
impl_npy_element!(u32, "<u4");

/// A loaded array: flat data in C order plus its shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NpyArray<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T> NpyArray<T> {
    /// Number of columns; 1 for one-dimensional arrays.
    #[inline] pub fn columns(&self) -> usize { self.shape.get(1).copied().unwrap_or(1) }
}

struct Header {
    dtype: DType,
    shape: Vec<usize>,
}

fn parse_header(text: &str) -> Result<Header> {
    let descr = Regex::new(DESCR)?.captures(text)
        .context("[io::npy] Header has no 'descr' entry")?;
    let dtype = DType::parse(&descr[1])?;

    let fortran = Regex::new(FORTRAN)?.captures(text)
        .context("[io::npy] Header has no 'fortran_order' entry")?;
    ensure!(&fortran[1] == "False", "[io::npy] Fortran-ordered arrays are not supported");

    let shape = Regex::new(SHAPE)?.captures(text)
        .context("[io::npy] Header has no 'shape' entry")?;
    let shape = shape[1].split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().with_context(|| format!("[io::npy] Invalid shape entry '{s}'")))
        .collect::<Result<Vec<_>>>()?;
    ensure!(
        matches!(shape.len(), 1 | 2),
        "[io::npy] Only 1-D and 2-D arrays are supported, got shape {shape:?}"
    );

    Ok(Header { dtype, shape })
}

fn read_header<R: Read>(reader: &mut R) -> Result<Header> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)
        .context("[io::npy] Failed to read magic bytes")?;
    ensure!(&magic == MAGIC, "[io::npy] Invalid magic: not a .npy file");

    let mut version = [0u8; 2];
    reader.read_exact(&mut version)
        .context("[io::npy] Failed to read version")?;
    ensure!(version[0] == 1, "[io::npy] Unsupported format version {}.{}", version[0], version[1]);

    let mut b2 = [0u8; 2];
    reader.read_exact(&mut b2)
        .context("[io::npy] Failed to read header length")?;
    let mut text = vec![0u8; u16::from_le_bytes(b2) as usize];
    reader.read_exact(&mut text)
        .context("[io::npy] Failed to read header")?;
    let text = String::from_utf8(text).context("[io::npy] Header is not valid text")?;

    parse_header(&text)
}

fn read_array<T: NpyElement, R: Read>(reader: &mut R) -> Result<NpyArray<T>> {
    let Header { dtype, shape } = read_header(reader)?;
    let count: usize = shape.iter().product();

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)
        .context("[io::npy] Failed to read array data")?;
    ensure!(
        bytes.len() == count * dtype.size(),
        "[io::npy] Data holds {} bytes, expected {} for shape {shape:?}",
        bytes.len(), count * dtype.size()
    );

    let data = bytes.chunks_exact(dtype.size())
        .enumerate()
        .map(|(i, chunk)| -> Result<T> {
            let value = match dtype {
                DType::I8 => T::from_i64(i64::from_le_bytes(chunk.try_into()?)),
                DType::U8 => T::from_u64(u64::from_le_bytes(chunk.try_into()?)),
                DType::I4 => T::from_i64(i32::from_le_bytes(chunk.try_into()?) as i64),
                DType::U4 => T::from_u64(u32::from_le_bytes(chunk.try_into()?) as u64),
            };
            value.with_context(|| format!("[io::npy] Element {i} does not fit in {}", T::DESCR))
        })
        .collect::<Result<Vec<T>>>()?;

    Ok(NpyArray { shape, data })
}

fn write_array<T: NpyElement, W: Write>(writer: &mut W, data: &[T], shape: &[usize]) -> Result<()> {
    ensure!(matches!(shape.len(), 1 | 2), "[io::npy] Only 1-D and 2-D arrays are supported, got shape {shape:?}");
    ensure!(
        shape.iter().product::<usize>() == data.len(),
        "[io::npy] Shape {shape:?} does not match {} elements", data.len()
    );

    let dims = match shape {
        [n] => format!("({n},)"),
        _ => format!("({})", shape.iter().map(usize::to_string).collect::<Vec<_>>().join(", ")),
    };
    let mut header = format!("{{'descr': '{}', 'fortran_order': False, 'shape': {dims}, }}", T::DESCR);
    // Magic, version and length prefix take 10 bytes; the header ends with a newline.
    let padded = (10 + header.len() + 1).div_ceil(ALIGN) * ALIGN;
    header.push_str(&" ".repeat(padded - 10 - header.len() - 1));
    header.push('\n');

    writer.write_all(MAGIC)
        .context("[io::npy] Failed to write magic bytes")?;
    writer.write_all(&[1, 0])
        .context("[io::npy] Failed to write version")?;
    writer.write_all(&(header.len() as u16).to_le_bytes())
        .context("[io::npy] Failed to write header length")?;
    writer.write_all(header.as_bytes())
        .context("[io::npy] Failed to write header")?;

    let mut bytes = Vec::with_capacity(data.len() * std::mem::size_of::<T>());
    for &value in data {
        value.write_le(&mut bytes);
    }
    writer.write_all(&bytes)
        .context("[io::npy] Failed to write array data")?;
    Ok(())
}

/// Read an array from `.npy` bytes.
pub fn read_array_bytes<T: NpyElement>(bytes: &[u8]) -> Result<NpyArray<T>> {
    read_array(&mut Cursor::new(bytes))
}

/// Write an array to `.npy` bytes.
pub fn write_array_bytes<T: NpyElement>(data: &[T], shape: &[usize]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_array(&mut out, data, shape)?;
    Ok(out)
}

/// Load an array from a `.npy` file, converting elements to `T`.
pub fn load_array<T: NpyElement>(path: impl AsRef<Path>) -> Result<NpyArray<T>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("[io::npy] Failed to open {}", path.display()))?;
    read_array(&mut BufReader::new(file))
        .with_context(|| format!("[io::npy] Failed to load {}", path.display()))
}

/// Save an array to a `.npy` file.
pub fn save_array<T: NpyElement>(path: impl AsRef<Path>, data: &[T], shape: &[usize]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("[io::npy] Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_array(&mut writer, data, shape)
        .with_context(|| format!("[io::npy] Failed to save {}", path.display()))?;
    writer.flush()
        .with_context(|| format!("[io::npy] Failed to flush {}", path.display()))
}
