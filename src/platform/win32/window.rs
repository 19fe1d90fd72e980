//! Top-level window enumeration.

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use windows::Win32::Foundation::{BOOL, CloseHandle, HWND, LPARAM, TRUE};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
    QueryFullProcessImageNameW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId, IsWindow,
    IsWindowVisible,
};

use super::hwnd;
use crate::capture::WindowId;
use crate::platform::{WindowLocator, WindowRecord, matches_keyword};

/// Finds visible, titled top-level windows by process name or title.
#[derive(Clone, Copy, Debug, Default)]
pub struct Win32WindowLocator;

impl WindowLocator for Win32WindowLocator {
    fn find(&self, keyword: &str) -> Vec<WindowRecord> {
        let matches: Vec<WindowRecord> = enumerate_windows()
            .into_iter()
            .filter(|r| matches_keyword(&r.process_name, &r.window_title, keyword))
            .collect();
        log::info!("Found {} window(s) matching \"{}\"", matches.len(), keyword);
        matches
    }

    fn describe(&self, window: WindowId) -> Option<WindowRecord> {
        let hwnd = hwnd(window);
        unsafe {
            if !IsWindow(hwnd).as_bool() {
                return None;
            }
            window_record(hwnd)
        }
    }
}

/// All visible top-level windows that have a title and a resolvable process.
pub fn enumerate_windows() -> Vec<WindowRecord> {
    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let records = &mut *(lparam.0 as *mut Vec<WindowRecord>);
            if IsWindowVisible(hwnd).as_bool() {
                if let Some(record) = window_record(hwnd).filter(|r| !r.window_title.is_empty()) {
                    records.push(record);
                }
            }
            TRUE
        }
    }

    let mut records: Vec<WindowRecord> = Vec::new();
    unsafe {
        if let Err(e) = EnumWindows(Some(enum_callback), LPARAM(&mut records as *mut _ as isize)) {
            log::warn!("EnumWindows failed: {}", e);
        }
    }
    log::debug!("Enumerated {} visible titled windows", records.len());
    records
}

/// Title, owning process and image name of a window. The title may be empty.
unsafe fn window_record(hwnd: HWND) -> Option<WindowRecord> {
    unsafe {
        let title_len = GetWindowTextLengthW(hwnd).max(0);
        let mut title_buf: Vec<u16> = vec![0; (title_len + 1) as usize];
        let copied = GetWindowTextW(hwnd, &mut title_buf);
        let window_title = OsString::from_wide(&title_buf[..copied.max(0) as usize])
            .to_string_lossy()
            .to_string();

        let mut process_id: u32 = 0;
        GetWindowThreadProcessId(hwnd, Some(&mut process_id));
        if process_id == 0 {
            return None;
        }

        let process_name = process_name(process_id).unwrap_or_default();
        Some(WindowRecord {
            process_id,
            process_name,
            window_title,
            window: WindowId(hwnd.0 as isize),
        })
    }
}

/// Executable file name of a process, e.g. `notepad.exe`.
fn process_name(process_id: u32) -> Option<String> {
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, process_id).ok()?;

        let mut name_buf: Vec<u16> = vec![0; 1024];
        let mut len = name_buf.len() as u32;
        let result = QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_WIN32,
            windows::core::PWSTR(name_buf.as_mut_ptr()),
            &mut len,
        );
        let _ = CloseHandle(handle);

        if result.is_err() || len == 0 {
            log::debug!("Could not resolve image name of process {}", process_id);
            return None;
        }

        let full_path = OsString::from_wide(&name_buf[..len as usize])
            .to_string_lossy()
            .to_string();
        full_path.rsplit('\\').next().map(str::to_string)
    }
}
