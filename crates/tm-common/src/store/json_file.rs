use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::Mutex,
};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use super::{RequestPatch, Store, StoreError, TutorPatch};
use crate::{ParentRequest, TutorProfile};

const REQUESTS_FILE: &str = "parentRequests.json";
const TUTORS_FILE: &str = "tutorProfiles.json";

/// コレクションごとに JSON 配列ファイルを1つ持つストア。
///
/// 変更のたびにコレクション全体を書き直す（一時ファイル → rename）。
/// ファイルが無ければ空コレクションとして扱う。
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "opened json file store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn read_collection<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        match fs::read(self.dir.join(file)) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_collection<T: Serialize>(&self, file: &str, items: &[T]) -> Result<(), StoreError> {
        let target = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(items)?)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    /// 読み込み → 変更 → 書き戻しを書き込みロック下で行う
    fn modify<T, R>(
        &self,
        file: &str,
        f: impl FnOnce(&mut Vec<T>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut items = self.read_collection(file)?;
        let result = f(&mut items)?;
        self.write_collection(file, &items)?;
        Ok(result)
    }
}

impl Store for JsonFileStore {
    fn list_requests(&self) -> Result<Vec<ParentRequest>, StoreError> {
        self.read_collection(REQUESTS_FILE)
    }

    fn list_tutors(&self) -> Result<Vec<TutorProfile>, StoreError> {
        self.read_collection(TUTORS_FILE)
    }

    #[instrument(skip(self, request), fields(request_id = %request.id))]
    fn add_request(&self, request: ParentRequest) -> Result<(), StoreError> {
        self.modify(REQUESTS_FILE, |requests: &mut Vec<ParentRequest>| {
            if requests.iter().any(|r| r.id == request.id) {
                return Err(StoreError::Duplicate {
                    kind: "request",
                    id: request.id.clone(),
                });
            }
            requests.push(request);
            Ok(())
        })
    }

    #[instrument(skip(self, tutor), fields(tutor_id = %tutor.user_id))]
    fn add_tutor(&self, tutor: TutorProfile) -> Result<(), StoreError> {
        self.modify(TUTORS_FILE, |tutors: &mut Vec<TutorProfile>| {
            if tutors.iter().any(|t| t.user_id == tutor.user_id) {
                return Err(StoreError::Duplicate {
                    kind: "tutor",
                    id: tutor.user_id.clone(),
                });
            }
            tutors.push(tutor);
            Ok(())
        })
    }

    #[instrument(skip(self, patch))]
    fn update_request(
        &self,
        id: &str,
        patch: &RequestPatch,
    ) -> Result<Option<ParentRequest>, StoreError> {
        self.modify(REQUESTS_FILE, |requests: &mut Vec<ParentRequest>| {
            Ok(requests.iter_mut().find(|r| r.id == id).map(|request| {
                patch.apply(request);
                request.clone()
            }))
        })
    }

    #[instrument(skip(self, patch))]
    fn update_tutor(
        &self,
        user_id: &str,
        patch: &TutorPatch,
    ) -> Result<Option<TutorProfile>, StoreError> {
        self.modify(TUTORS_FILE, |tutors: &mut Vec<TutorProfile>| {
            Ok(tutors.iter_mut().find(|t| t.user_id == user_id).map(|tutor| {
                patch.apply(tutor);
                tutor.clone()
            }))
        })
    }
}
