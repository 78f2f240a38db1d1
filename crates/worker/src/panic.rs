use std::any::Any;

/// Renders a panic payload caught by `catch_unwind` as a message.
///
/// `panic!` payloads are either `&'static str` or `String`; anything else
/// comes from `panic_any` and has no readable form.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		return (*s).to_string();
	}
	if let Some(s) = payload.downcast_ref::<String>() {
		return s.clone();
	}
	"non-string panic payload".to_string()
}

#[cfg(test)]
mod tests {
	use std::panic::catch_unwind;

	use super::panic_message;

	#[test]
	fn extracts_static_str_payload() {
		let payload = catch_unwind(|| panic!("boom-str")).unwrap_err();
		assert_eq!(panic_message(&*payload), "boom-str");
	}

	#[test]
	fn extracts_string_payload() {
		let payload = catch_unwind(|| panic!("{}", String::from("boom-string"))).unwrap_err();
		assert_eq!(panic_message(&*payload), "boom-string");
	}

	#[test]
	fn falls_back_for_other_payloads() {
		let payload = catch_unwind(|| std::panic::panic_any(42_u32)).unwrap_err();
		assert_eq!(panic_message(&*payload), "non-string panic payload");
	}
}
