mod razorpay;

pub use razorpay::RazorpayGateway;
