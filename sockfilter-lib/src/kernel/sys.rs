//! Thin libc wrappers for the calls neither aya nor socket2 expose.
#![allow(unsafe_code)]

use std::ffi::{CStr, CString};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, BorrowedFd};

use libc::{c_int, c_void};

/// `SO_ATTACH_BPF` from `asm-generic/socket.h`: value is an eBPF program fd
pub const SO_ATTACH_BPF: c_int = 50;

/// `SO_DETACH_BPF` shares its value with `SO_DETACH_FILTER`
pub const SO_DETACH_BPF: c_int = libc::SO_DETACH_FILTER;

pub(crate) fn if_nametoindex(name: &str) -> io::Result<u32> {
    let name = CString::new(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: `name` is a valid NUL-terminated string that outlives the call.
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if index == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(index)
}

pub(crate) fn if_indextoname(index: u32) -> io::Result<String> {
    let mut buf = [0 as libc::c_char; libc::IF_NAMESIZE];
    // SAFETY: `buf` holds IF_NAMESIZE bytes, the size if_indextoname requires.
    let ret = unsafe { libc::if_indextoname(index, buf.as_mut_ptr()) };
    if ret.is_null() {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: on success the kernel wrote a NUL-terminated name into `buf`.
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Ok(name.to_string_lossy().into_owned())
}

/// Bind an `AF_PACKET` socket to one interface. `protocol` is already in network byte order.
pub(crate) fn bind_packet_socket(socket: BorrowedFd<'_>, protocol: u16, index: u32) -> io::Result<()> {
    let ifindex = c_int::try_from(index)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let addr = libc::sockaddr_ll {
        sll_family: libc::AF_PACKET as libc::c_ushort,
        sll_protocol: protocol,
        sll_ifindex: ifindex,
        sll_hatype: 0,
        sll_pkttype: 0,
        sll_halen: 0,
        sll_addr: [0; 8],
    };
    // SAFETY: `addr` is a fully initialised sockaddr_ll and the length matches its size.
    let ret = unsafe {
        libc::bind(
            socket.as_raw_fd(),
            (&addr as *const libc::sockaddr_ll).cast::<libc::sockaddr>(),
            mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// `setsockopt(socket, SOL_SOCKET, option, &program_fd)`
pub(crate) fn set_bpf_option(
    socket: BorrowedFd<'_>,
    option: c_int,
    program: BorrowedFd<'_>,
) -> io::Result<()> {
    let value: c_int = program.as_raw_fd();
    // SAFETY: `value` lives across the call and the length passed matches its size.
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            option,
            (&value as *const c_int).cast::<c_void>(),
            mem::size_of::<c_int>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Lift RLIMIT_MEMLOCK; kernels before 5.11 charge BPF maps against it.
pub(crate) fn raise_memlock_limit() -> io::Result<()> {
    let rlim = libc::rlimit { rlim_cur: libc::RLIM_INFINITY, rlim_max: libc::RLIM_INFINITY };
    // SAFETY: `rlim` is a valid rlimit for the duration of the call.
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_option_values() {
        assert_eq!(SO_ATTACH_BPF, 50);
        assert_eq!(SO_DETACH_BPF, 27);
    }

    #[test]
    fn test_if_nametoindex_unknown_interface() {
        assert!(if_nametoindex("nosuchiface0").is_err());
    }

    #[test]
    fn test_if_nametoindex_rejects_interior_nul() {
        let err = if_nametoindex("eth\0").err();
        assert_eq!(err.map(|e| e.kind()), Some(io::ErrorKind::InvalidInput));
    }

    #[test]
    fn test_loopback_round_trip() {
        let index = if_nametoindex("lo").unwrap_or_else(|e| panic!("lo missing: {e}"));
        assert!(index > 0);
        let name = if_indextoname(index).unwrap_or_else(|e| panic!("index {index}: {e}"));
        assert_eq!(name, "lo");
    }
}
