//! Fixed phone/OTP pairs accepted by the demo verification endpoint.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoContact {
    pub phone: &'static str,
    pub otp: &'static str,
    pub name: &'static str,
}

static DEMO_CONTACTS: [DemoContact; 5] = [
    DemoContact { phone: "+919876543210", otp: "123456", name: "John Doe" },
    DemoContact { phone: "+919876543211", otp: "654321", name: "Jane Smith" },
    DemoContact { phone: "+919876543212", otp: "111111", name: "Robert Johnson" },
    DemoContact { phone: "+919876543213", otp: "222222", name: "Emily Davis" },
    DemoContact { phone: "+919876543214", otp: "333333", name: "Michael Wilson" },
];

/// The contact whose phone and OTP both match exactly.
pub fn verify(phone: &str, otp: &str) -> Option<&'static DemoContact> {
    DEMO_CONTACTS
        .iter()
        .find(|contact| contact.phone == phone && contact.otp == otp)
}
