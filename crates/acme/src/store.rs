//! Temel dizin altında dosya tabanlı anahtar/değer alanı.
//!
//! Her yazım aynı dizindeki geçici bir dosyaya hazırlanır ve yerine taşınır.
//! Başka bir süreçteki challenge dinleyicisi yarım yazılmış belge görmez.

use std::fmt;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Kalıcı depolama katmanına ait hata türleri.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("acme temel dizini tanımlı değil")]
    EmptyBasePath,
    #[error("acme temel dizini mevcut değil: {}", .path.display())]
    MissingBasePath { path: PathBuf },
    #[error("geçersiz veri biçimi <{0}>")]
    UnsupportedFormat(String),
    #[error("{} okunamadı: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} yazılamadı: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} JSON olarak işlenemedi: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `write` çağrısının veri biçimi.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreFormat {
    #[default]
    Text,
    Json,
}

impl StoreFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for StoreFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreFormat {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(StoreError::UnsupportedFormat(value.to_owned())),
        }
    }
}

/// Temel dizine bağlı depolama alanı.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    base_path: PathBuf,
}

impl Store {
    /// Var olan bir temel dizin üzerinde depo açar.
    ///
    /// # Errors
    ///
    /// Yol boşsa veya diskte bulunmuyorsa hata döner; dizin oluşturulmaz.
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        if base_path.as_os_str().is_empty() {
            return Err(StoreError::EmptyBasePath);
        }
        if !base_path.is_dir() {
            return Err(StoreError::MissingBasePath { path: base_path });
        }
        Ok(Self { base_path })
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `None` temel dizini, `Some(label)` ise `<base>/<label>` alt dizinini seçer.
    ///
    /// Alt dizin ilk kullanımda oluşturulur.
    ///
    /// # Errors
    ///
    /// Alt dizin oluşturulamazsa `StoreError::Write` döner.
    pub fn scope(&self, label: Option<&str>) -> Result<Scope, StoreError> {
        let dir = match label.filter(|value| !value.is_empty()) {
            None => self.base_path.clone(),
            Some(label) => {
                let dir = self.base_path.join(label);
                if !dir.is_dir() {
                    fs::create_dir_all(&dir).map_err(|source| StoreError::Write {
                        path: dir.clone(),
                        source,
                    })?;
                }
                dir
            }
        };
        Ok(Scope { dir })
    }

    /// `scope` ile aynı dizini seçer ama diskte hiçbir şey oluşturmaz.
    #[must_use]
    pub fn lookup(&self, label: &str) -> Scope {
        Scope {
            dir: if label.is_empty() {
                self.base_path.clone()
            } else {
                self.base_path.join(label)
            },
        }
    }

    /// Temel dizin kapsamı; hiçbir zaman dizin oluşturmaz.
    #[must_use]
    pub fn root(&self) -> Scope {
        Scope {
            dir: self.base_path.clone(),
        }
    }
}

/// Depodaki tek bir dizin kapsamı.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    dir: PathBuf,
}

impl Scope {
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// # Errors
    ///
    /// Dosya okunamazsa `StoreError::Read` döner.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path(name);
        fs::read(&path).map_err(|source| StoreError::Read { path, source })
    }

    /// # Errors
    ///
    /// Dosya okunamazsa veya UTF-8 değilse `StoreError::Read` döner.
    pub fn read_to_string(&self, name: &str) -> Result<String, StoreError> {
        let path = self.path(name);
        fs::read_to_string(&path).map_err(|source| StoreError::Read { path, source })
    }

    /// # Errors
    ///
    /// Dosya okunamazsa veya beklenen şemaya uymuyorsa hata döner.
    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        let bytes = self.read(name)?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: self.path(name),
            source,
        })
    }

    /// Veriyi verilen biçimde yazar.
    ///
    /// `Text` biçiminde string değerler olduğu gibi, diğer değerler JSON
    /// gösterimleriyle yazılır.
    ///
    /// # Errors
    ///
    /// Serileştirme veya dosya yazımı başarısız olursa hata döner.
    pub fn write<T>(&self, name: &str, data: &T, format: StoreFormat) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = encode(&self.path(name), data, format)?;
        self.stage(name, &bytes)?.commit()
    }

    /// `write` çağrısının biçim adını metin olarak alan sürümü.
    ///
    /// # Errors
    ///
    /// Biçim `text` ya da `json` değilse `StoreError::UnsupportedFormat` döner.
    pub fn write_as<T>(&self, name: &str, data: &T, format: &str) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        self.write(name, data, format.parse()?)
    }

    /// Dosyayı siler; zaten yoksa hata sayılmaz.
    ///
    /// # Errors
    ///
    /// Silme başarısız olursa `StoreError::Write` döner.
    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write { path, source }),
        }
    }

    /// İçeriği geçici dosyaya yazar; hedef dosya `commit` çağrılana kadar değişmez.
    ///
    /// # Errors
    ///
    /// Geçici dosya oluşturulamaz veya yazılamazsa `StoreError::Write` döner.
    pub fn stage(&self, name: &str, contents: &[u8]) -> Result<StagedWrite, StoreError> {
        let target = self.path(name);
        let write_error = |source| StoreError::Write {
            path: target.clone(),
            source,
        };
        let mut file = NamedTempFile::new_in(&self.dir).map_err(write_error)?;
        file.write_all(contents).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        Ok(StagedWrite { file, target })
    }
}

/// Henüz yerine taşınmamış bir yazım. Düşürülürse geçici dosya silinir.
#[derive(Debug)]
pub struct StagedWrite {
    file: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Geçici dosyayı hedefin üzerine atomik olarak taşır.
    ///
    /// # Errors
    ///
    /// Yeniden adlandırma başarısız olursa `StoreError::Write` döner.
    pub fn commit(self) -> Result<(), StoreError> {
        let Self { file, target } = self;
        file.persist(&target).map_err(|err| StoreError::Write {
            path: target,
            source: err.error,
        })?;
        Ok(())
    }
}

fn encode<T>(path: &Path, data: &T, format: StoreFormat) -> Result<Vec<u8>, StoreError>
where
    T: Serialize + ?Sized,
{
    let json_error = |source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    };
    match format {
        StoreFormat::Json => serde_json::to_vec(data).map_err(json_error),
        StoreFormat::Text => match serde_json::to_value(data).map_err(json_error)? {
            Value::String(text) => Ok(text.into_bytes()),
            other => Ok(other.to_string().into_bytes()),
        },
    }
}
