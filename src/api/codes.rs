//! Import-task failure taxonomy.
//!
//! The status endpoint reports failures as a numeric `job_status`. Each known
//! code maps to one stable [`ImportErrorCode`] constant and a fixed message,
//! so callers can branch on the constant ("file too large", "unsupported
//! format") without string matching. Several internal codes share the
//! [`ImportErrorCode::InternalError`] constant.
//!
//! [`ImportErrorCode::Connectivity`] is not a service code: the poller uses it
//! when the task could not be reached at all, paired with
//! [`CONNECTIVITY_CODE`].

use serde::{Deserialize, Serialize};

/// `code` carried by a connectivity failure. `0` is the success status, so it
/// never collides with a code the service reports.
pub const CONNECTIVITY_CODE: u32 = 0;

/// Stable constant for a failed import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportErrorCode {
    InternalError,
    Encrypted,
    QuotaExceeded,
    TooManyFolderNodes,
    ProcessingTimeout,
    PermissionDenied,
    FormatUnsupported,
    OfficeFormatUnsupported,
    FileTooLarge,
    FolderPermissionDenied,
    FolderDeleted,
    ExtensionMismatch,
    FolderNotFound,
    FileTypeMismatch,
    SourceExpired,
    ExportForbidden,
    CorruptSource,
    BlockCountExceeded,
    BlockDepthExceeded,
    BlockSizeExceeded,
    /// Status polling lost contact with the service.
    Connectivity,
}

impl ImportErrorCode {
    /// Look up the constant for a `job_status` failure code.
    pub fn from_code(code: u32) -> Option<Self> {
        use ImportErrorCode::*;
        let kind = match code {
            3 | 101 | 102 | 103 | 106 | 109 | 114 | 5000 => InternalError,
            100 => Encrypted,
            104 => QuotaExceeded,
            105 => TooManyFolderNodes,
            108 => ProcessingTimeout,
            110 => PermissionDenied,
            112 => FormatUnsupported,
            113 => OfficeFormatUnsupported,
            115 => FileTooLarge,
            116 => FolderPermissionDenied,
            117 => FolderDeleted,
            118 => ExtensionMismatch,
            119 => FolderNotFound,
            120 => FileTypeMismatch,
            121 => SourceExpired,
            122 => ExportForbidden,
            129 => CorruptSource,
            7000 => BlockCountExceeded,
            7001 => BlockDepthExceeded,
            7002 => BlockSizeExceeded,
            _ => return None,
        };
        Some(kind)
    }

    /// The platform's user-facing description.
    pub fn message(self) -> &'static str {
        use ImportErrorCode::*;
        match self {
            InternalError => "内部错误",
            Encrypted => "导入文档已加密",
            QuotaExceeded => "租户容量不足",
            TooManyFolderNodes => "文件夹节点太多",
            ProcessingTimeout => "处理超时",
            PermissionDenied => "无权限",
            FormatUnsupported => "格式不支持",
            OfficeFormatUnsupported => "office格式不支持",
            FileTooLarge => "导入文件过大",
            FolderPermissionDenied => "当前身份无导入至该文件夹的权限",
            FolderDeleted => "目录已删除",
            ExtensionMismatch => "导入文件和任务指定后缀不匹配",
            FolderNotFound => "目录不存在",
            FileTypeMismatch => "导入文件和任务指定文件类型不匹配",
            SourceExpired => "导入文件已过期",
            ExportForbidden => "创建副本中禁止导出",
            CorruptSource => "文件格式损坏，请另存为新文件后导入",
            BlockCountExceeded => "docx block 数量超过系统上限",
            BlockDepthExceeded => "docx block 层级超过系统上限",
            BlockSizeExceeded => "docx block 大小超过系统上限",
            Connectivity => "网络连接失败",
        }
    }

    /// Failures that may clear up if the same import is submitted again.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ImportErrorCode::InternalError
                | ImportErrorCode::ProcessingTimeout
                | ImportErrorCode::Connectivity
        )
    }
}
