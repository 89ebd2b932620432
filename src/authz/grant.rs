use crate::identity::sanitize_username;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use utoipa::ToSchema;

pub const PERMISSION_LIST: &str = "list";

/// Permissions granted on every provisioned folder.
pub const FILE_MANAGEMENT_PERMISSIONS: [&str; 7] = [
    "upload",
    "list",
    "download",
    "create_dirs",
    "delete",
    "overwrite",
    "rename",
];

/// Username returned for identities the directory does not know.
pub const ANONYMOUS_USERNAME: &str = "anonymous_user@wso2.org";

const STATUS_ENABLED: i32 = 1;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VirtualFolder {
    pub name: String,
    pub virtual_path: String,
    pub mapped_path: String,
}

/// Virtual filesystem view handed back to SFTPGo.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub username: String,
    pub home_dir: String,
    pub permissions: BTreeMap<String, Vec<String>>,
    pub status: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_folders: Vec<VirtualFolder>,
}

impl Grant {
    /// Home directory and list-only root, no folders.
    #[must_use]
    pub fn root_only(username: &str, home_root: &str) -> Self {
        let mut permissions = BTreeMap::new();
        permissions.insert("/".to_string(), vec![PERMISSION_LIST.to_string()]);
        Self {
            username: username.to_string(),
            home_dir: join_path(home_root, &sanitize_username(username)),
            permissions,
            status: STATUS_ENABLED,
            virtual_folders: Vec::new(),
        }
    }

    #[must_use]
    pub fn anonymous(home_root: &str) -> Self {
        Self::root_only(ANONYMOUS_USERNAME, home_root)
    }

    /// One virtual folder per name, each with the file-management permission set.
    #[must_use]
    pub fn with_folders(
        username: &str,
        home_root: &str,
        folder_root: &str,
        folders: &[String],
    ) -> Self {
        let mut grant = Self::root_only(username, home_root);
        for folder in folders {
            let virtual_path = format!("/{folder}");
            grant.permissions.insert(
                virtual_path.clone(),
                FILE_MANAGEMENT_PERMISSIONS
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            );
            grant.virtual_folders.push(VirtualFolder {
                name: folder.clone(),
                virtual_path,
                mapped_path: join_path(folder_root, folder),
            });
        }
        grant
    }

    #[must_use]
    pub fn folder_names(&self) -> Vec<&str> {
        self.virtual_folders
            .iter()
            .map(|folder| folder.name.as_str())
            .collect()
    }
}

pub(crate) fn join_path(root: &str, segment: &str) -> String {
    Path::new(root).join(segment).to_string_lossy().into_owned()
}
