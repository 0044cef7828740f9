use std::{
    collections::HashMap,
    hash::Hash,
    io::{Read, Write},
};

use crate::{wire_serde_for_number, SerdeError, SerdeResult};

/// Byte codec for everything that crosses a rank boundary: pointers, update
/// values and the maps that group them.
pub trait WireSerde: Sized {
    /// serialize self into bytes
    fn serialize_into<W: Write>(&self, writer: W) -> SerdeResult<()>;

    /// deserialize bytes into self
    fn deserialize_from<R: Read>(reader: R) -> SerdeResult<Self>;
}

impl WireSerde for () {
    fn serialize_into<W: Write>(&self, _writer: W) -> SerdeResult<()> {
        Ok(())
    }

    fn deserialize_from<R: Read>(_reader: R) -> SerdeResult<Self> {
        Ok(())
    }
}

wire_serde_for_number!(u8, 1);
wire_serde_for_number!(u32, 4);
wire_serde_for_number!(u64, 8);
wire_serde_for_number!(i32, 4);
wire_serde_for_number!(i64, 8);
wire_serde_for_number!(f32, 4);
wire_serde_for_number!(f64, 8);

// usize is pinned to 8 bytes so ranks built for different targets agree
impl WireSerde for usize {
    fn serialize_into<W: Write>(&self, writer: W) -> SerdeResult<()> {
        (*self as u64).serialize_into(writer)
    }

    fn deserialize_from<R: Read>(reader: R) -> SerdeResult<Self> {
        let v = u64::deserialize_from(reader)?;
        usize::try_from(v).map_err(|_| SerdeError::DeserializeError)
    }
}

impl WireSerde for bool {
    fn serialize_into<W: Write>(&self, writer: W) -> SerdeResult<()> {
        (*self as u8).serialize_into(writer)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> SerdeResult<Self> {
        match u8::deserialize_from(&mut reader)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SerdeError::DeserializeError),
        }
    }
}

impl WireSerde for String {
    fn serialize_into<W: Write>(&self, mut writer: W) -> SerdeResult<()> {
        let bytes = self.as_bytes();
        bytes.len().serialize_into(&mut writer)?;
        writer.write_all(bytes)?;
        Ok(())
    }

    fn deserialize_from<R: Read>(mut reader: R) -> SerdeResult<Self> {
        let len = usize::deserialize_from(&mut reader)?;
        // the length prefix is untrusted: read what is there, then check it was enough
        let mut buf = Vec::new();
        let read = reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
        if read != len {
            return Err(SerdeError::IOError(std::io::ErrorKind::UnexpectedEof.into()));
        }
        String::from_utf8(buf).map_err(|_| SerdeError::DeserializeError)
    }
}

impl<V: WireSerde> WireSerde for Vec<V> {
    fn serialize_into<W: Write>(&self, mut writer: W) -> SerdeResult<()> {
        self.len().serialize_into(&mut writer)?;
        for v in self.iter() {
            v.serialize_into(&mut writer)?;
        }
        Ok(())
    }

    fn deserialize_from<R: Read>(mut reader: R) -> SerdeResult<Self> {
        let len = usize::deserialize_from(&mut reader)?;
        // the length prefix is untrusted, so grow as elements actually arrive
        let mut v = Vec::new();
        for _ in 0..len {
            v.push(V::deserialize_from(&mut reader)?);
        }
        Ok(v)
    }
}

impl<V: WireSerde, const N: usize> WireSerde for [V; N] {
    fn serialize_into<W: Write>(&self, mut writer: W) -> SerdeResult<()> {
        for v in self.iter() {
            v.serialize_into(&mut writer)?;
        }
        Ok(())
    }

    fn deserialize_from<R: Read>(mut reader: R) -> SerdeResult<Self> {
        let mut v = Vec::with_capacity(N);
        for _ in 0..N {
            v.push(V::deserialize_from(&mut reader)?);
        }
        v.try_into().map_err(|_| SerdeError::DeserializeError)
    }
}

impl<A: WireSerde, B: WireSerde> WireSerde for (A, B) {
    fn serialize_into<W: Write>(&self, mut writer: W) -> SerdeResult<()> {
        self.0.serialize_into(&mut writer)?;
        self.1.serialize_into(&mut writer)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> SerdeResult<Self> {
        let a = A::deserialize_from(&mut reader)?;
        let b = B::deserialize_from(&mut reader)?;
        Ok((a, b))
    }
}

impl<K: WireSerde + Eq + Hash, V: WireSerde> WireSerde for HashMap<K, V> {
    fn serialize_into<W: Write>(&self, mut writer: W) -> SerdeResult<()> {
        self.len().serialize_into(&mut writer)?;
        for (k, v) in self.iter() {
            k.serialize_into(&mut writer)?;
            v.serialize_into(&mut writer)?;
        }
        Ok(())
    }

    fn deserialize_from<R: Read>(mut reader: R) -> SerdeResult<Self> {
        let len = usize::deserialize_from(&mut reader)?;
        let mut map = HashMap::new();
        for _ in 0..len {
            let k = K::deserialize_from(&mut reader)?;
            let v = V::deserialize_from(&mut reader)?;
            if map.insert(k, v).is_some() {
                // a map on the wire never carries the same key twice
                return Err(SerdeError::DeserializeError);
            }
        }
        Ok(map)
    }
}
